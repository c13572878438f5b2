/// Type plan compilation and caching.
use std::sync::Arc;

use marshal_core::{
    Describe, FieldDescriptor, InterfaceId, Marshaller, Node, Operand, Result, ScalarKind, Transform,
    TypeDescriptor, TypeKey, TypeKind, Value,
};

#[derive(Debug, Default, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: Option<String>,
    session: String,
}

impl Describe for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::structure::<Self>()
            .field("id", |u: &User| &u.id, |u: &mut User, v| u.id = v)
            .with_field(FieldDescriptor::new("name", |u: &User| &u.name, |u: &mut User, v| u.name = v).renamed("login"))
            .field("email", |u: &User| &u.email, |u: &mut User, v| u.email = v)
            .with_field(
                FieldDescriptor::new("session", |u: &User| &u.session, |u: &mut User, v| u.session = v).skipped(),
            )
            .default_factory()
            .build()
    }
}

#[derive(Default)]
struct Clash {
    a: i32,
    b: i32,
}

impl Describe for Clash {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::structure::<Self>()
            .field("a", |c: &Clash| &c.a, |c: &mut Clash, v| c.a = v)
            .with_field(FieldDescriptor::new("b", |c: &Clash| &c.b, |c: &mut Clash, v| c.b = v).renamed("a"))
            .default_factory()
            .build()
    }
}

struct Handle;

impl Describe for Handle {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::opaque()
    }
}

const LABELLED: InterfaceId = InterfaceId("labelled");
const PRINTABLE: InterfaceId = InterfaceId("printable");

struct Tagged;

impl Describe for Tagged {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::opaque().implements(LABELLED).implements(PRINTABLE)
    }
}

/// Replaces any value with a fixed string; used to observe which transform
/// a plan resolved.
struct Stamp(&'static str);

impl Transform for Stamp {
    fn name(&self) -> &str {
        self.0
    }

    fn serialize<'a>(&self, _engine: &Marshaller, _operand: Operand<'a>) -> Result<Operand<'a>> {
        Ok(Operand::Owned(Box::new(Value::from(self.0))))
    }

    fn deserialize<'a>(&self, _engine: &Marshaller, _target: TypeKey, node: Node<'a>) -> Result<Node<'a>> {
        Ok(node)
    }
}

// ============================================================================
// Field tables
// ============================================================================

#[test]
fn fields_follow_declaration_order_with_renames_and_skips() {
    let engine = Marshaller::new();
    let plan = engine.plan::<User>().unwrap();

    assert_eq!(plan.field_names(), vec!["id", "login", "email"]);
    assert_eq!(plan.fields()[1].name(), "name");
    assert_eq!(plan.fields()[0].ty(), TypeKey::of::<u32>());
    assert_eq!(plan.dimensions(), 0);
}

#[test]
fn scalar_plans_carry_their_kind() {
    let engine = Marshaller::new();
    let plan = engine.plan::<u16>().unwrap();
    match plan.kind() {
        TypeKind::Scalar(access) => assert_eq!(access.kind, ScalarKind::U16),
        other => panic!("expected a scalar plan, got {other:?}"),
    }
    assert!(plan.fields().is_empty());
}

#[test]
fn array_dimensions_count_nesting() {
    let engine = Marshaller::new();
    assert_eq!(engine.plan::<Vec<i32>>().unwrap().dimensions(), 1);
    assert_eq!(engine.plan::<Vec<Vec<i32>>>().unwrap().dimensions(), 2);
    assert_eq!(engine.plan::<Vec<Vec<Vec<String>>>>().unwrap().dimensions(), 3);
    assert_eq!(engine.plan::<Vec<User>>().unwrap().dimensions(), 1);
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn repeated_lookups_return_the_same_plan() {
    let engine = Marshaller::new();
    let first = engine.plan::<User>().unwrap();
    let second = engine.plan::<User>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.field_names(), second.field_names());
    assert!(engine.plans().contains(TypeKey::of::<User>()));
}

#[test]
fn separate_engines_keep_separate_caches() {
    let left = Marshaller::new();
    let right = Marshaller::new();
    left.plan::<User>().unwrap();

    assert!(left.plans().contains(TypeKey::of::<User>()));
    assert!(!right.plans().contains(TypeKey::of::<User>()));
    assert!(right.plans().is_empty());
}

#[test]
fn duplicate_keys_fail_compilation_and_the_failure_is_cached() {
    let engine = Marshaller::new();
    let err = engine.plan::<Clash>().unwrap_err();
    assert!(err.is_compile());
    assert!(err.to_string().contains("duplicate field key `a`"));

    let cached_len = engine.plans().len();
    let again = engine.plan::<Clash>().unwrap_err();
    assert_eq!(err, again);
    assert_eq!(engine.plans().len(), cached_len);
}

#[test]
fn opaque_type_without_transform_fails_compilation() {
    let engine = Marshaller::new();
    let err = engine.plan::<Handle>().unwrap_err();
    assert!(err.is_compile());

    let err = engine.serialize(&Handle).unwrap_err();
    assert!(err.is_compile());
}

// ============================================================================
// Transform resolution
// ============================================================================

#[test]
fn exact_registration_wins_over_interfaces() {
    let engine = Marshaller::builder()
        .register_interface_transform(LABELLED, Arc::new(Stamp("labelled")))
        .register_transform::<Tagged>(Arc::new(Stamp("exact")))
        .build();

    let plan = engine.plan::<Tagged>().unwrap();
    let names: Vec<&str> = plan.transforms().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["exact"]);
    assert_eq!(engine.serialize(&Tagged).unwrap(), Value::from("exact"));
}

#[test]
fn first_declared_interface_is_most_specific() {
    let engine = Marshaller::builder()
        .register_interface_transform(PRINTABLE, Arc::new(Stamp("printable")))
        .register_interface_transform(LABELLED, Arc::new(Stamp("labelled")))
        .build();

    assert_eq!(engine.serialize(&Tagged).unwrap(), Value::from("labelled"));
}

#[test]
fn exact_registrations_form_a_chain() {
    let engine = Marshaller::builder()
        .register_transform::<Tagged>(Arc::new(Stamp("first")))
        .register_transform::<Tagged>(Arc::new(Stamp("second")))
        .build();

    let plan = engine.plan::<Tagged>().unwrap();
    let names: Vec<&str> = plan.transforms().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn list_types_resolve_the_default_list_transform() {
    let engine = Marshaller::new();
    let plan = engine.plan::<std::collections::VecDeque<i32>>().unwrap();
    let names: Vec<&str> = plan.transforms().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["list"]);
    assert!(plan.list_access().is_some());
}
