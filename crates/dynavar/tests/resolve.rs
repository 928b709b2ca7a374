mod common;

use common::{driver, driver_with, NumAddress};
use dynavar::{
    BindingError, DriverOpts, ParamIndex, RegisterError, Rejection, ScalarHandlers, ValueKind,
};

#[test]
fn unknown_function_is_rejected() {
    let mut driver = driver();
    let err = driver.resolve_binding("NOPE 1").unwrap_err();
    assert_eq!(err, BindingError::UnknownFunction("NOPE".into()));
    assert!(driver.variables().is_empty());
}

#[test]
fn parse_failures_surface() {
    let mut driver = driver();
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    assert_eq!(
        driver.resolve_binding("   ").unwrap_err(),
        BindingError::EmptyBinding
    );
    assert_eq!(
        driver.resolve_binding("VAL {j}").unwrap_err(),
        BindingError::ReservedArgument("{j}".into())
    );
}

#[test]
fn indices_are_dense_and_stable() {
    let mut driver = driver();
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    let a = driver.resolve_binding("VAL 1").unwrap();
    let b = driver.resolve_binding("VAL 2").unwrap();
    assert_eq!(a, ParamIndex(0));
    assert_eq!(b, ParamIndex(1));
    // Re-resolving returns the original index.
    assert_eq!(driver.resolve_binding("VAL 1").unwrap(), a);
    let vars = driver.variables();
    assert_eq!(vars.len(), 2);
    assert_eq!(vars[0].index(), a);
    assert_eq!(vars[0].kind(), ValueKind::Int32);
    assert_eq!(vars[0].binding().raw(), "VAL 1");
}

#[test]
fn spacing_variants_share_a_variable() {
    let mut driver = driver();
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    let a = driver.resolve_binding("VAL  7").unwrap();
    let b = driver.resolve_binding(" VAL 7 ").unwrap();
    assert_eq!(a, b);
    assert_eq!(driver.variables().len(), 1);
}

#[test]
fn equal_addresses_share_a_variable_across_spellings() {
    let mut driver = driver();
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    // Different normalized text, same numeric address.
    let a = driver.resolve_binding("VAL 7").unwrap();
    let b = driver.resolve_binding("VAL 07").unwrap();
    assert_eq!(a, b);
    assert_eq!(driver.variables().len(), 1);
    let var = driver.variable(a).unwrap();
    assert_eq!(
        var.address_as::<NumAddress>(),
        Some(&NumAddress {
            function: "VAL".into(),
            number: 7,
        })
    );
    // The display text stays the first spelling.
    assert_eq!(var.binding().raw(), "VAL 7");
}

#[test]
fn address_rejection_names_the_binding() {
    let mut driver = driver();
    driver
        .register_int32("BAD", ScalarHandlers::new())
        .unwrap();
    let err = driver.resolve_binding("BAD 3").unwrap_err();
    assert_eq!(
        err,
        BindingError::AddressRejected {
            binding: "BAD 3".into(),
            reason: Rejection::new("bad address"),
        }
    );
}

#[test]
fn variable_veto_leaves_no_residue() {
    let mut driver = driver();
    driver
        .register_int32("VETO", ScalarHandlers::new())
        .unwrap();
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    let err = driver.resolve_binding("VETO x").unwrap_err();
    assert_eq!(
        err,
        BindingError::VariableRejected {
            binding: "VETO x".into(),
            reason: Rejection::new("vetoed"),
        }
    );
    // The failed attempt must not leak an index or a cache slot.
    assert!(driver.variables().is_empty());
    let index = driver.resolve_binding("VAL 1").unwrap();
    assert_eq!(index, ParamIndex(0));
    // And the vetoed binding still fails the same way afterwards.
    assert!(driver.resolve_binding("VETO x").is_err());
}

#[test]
fn kind_conflict_keeps_the_first_registration() {
    let mut driver = driver();
    driver
        .register_int32("VAL", ScalarHandlers::new().read(|rig: &mut common::Rig, _| Ok(rig.i32_cell.into())))
        .unwrap();
    let err = driver
        .register_float64("VAL", ScalarHandlers::new())
        .unwrap_err();
    assert_eq!(
        err,
        RegisterError::KindConflict {
            function: "VAL".into(),
            registered: ValueKind::Int32,
            requested: ValueKind::Float64,
        }
    );
    // The original registration still resolves and dispatches.
    let index = driver.resolve_binding("VAL 1").unwrap();
    driver.device_mut().i32_cell = 11;
    assert_eq!(driver.read_int32(index), Ok(11));
}

#[test]
fn init_hook_sees_the_bound_variables_once() {
    let opts: DriverOpts<common::Rig> = DriverOpts::new().init_hook(|driver| {
        let seen: Vec<_> = driver
            .variables()
            .iter()
            .map(|info| info.binding().normalized())
            .collect();
        assert_eq!(seen, ["VAL 1", "VAL 2"]);
        // The hook may dispatch: registration is already complete.
        let index = driver.resolve_binding("VAL 1").unwrap();
        driver.write_int32(index, 99).unwrap();
    });
    let mut driver = driver_with(opts);
    driver
        .register_int32("VAL", ScalarHandlers::new())
        .unwrap();
    driver.resolve_binding("VAL 1").unwrap();
    driver.resolve_binding("VAL 2").unwrap();

    driver.complete_init();
    assert_eq!(driver.read_int32(ParamIndex(0)), Ok(99));
    // A second call is a no-op.
    driver.complete_init();
    assert_eq!(driver.read_int32(ParamIndex(0)), Ok(99));
}

#[test]
fn tag_arguments_resolve_to_distinct_variables() {
    let mut driver = driver();
    driver
        .register_octet("NAME", dynavar::OctetHandlers::new())
        .unwrap();
    let a = driver.resolve_binding("NAME left").unwrap();
    let b = driver.resolve_binding("NAME right").unwrap();
    assert_ne!(a, b);
    assert_eq!(driver.variables().len(), 2);
}
