use std::rc::Rc;

use kiln::interpreter::types::{Field, FunctionType, MapType, StructType, Type, TypeBindings, TypeRegistry};

fn structure(name: &str, fields: &[(&str, &Type)]) -> Type {
    let fields = fields.iter()
                       .map(|(name, ty)| Field { name:    (*name).to_string(),
                                                 ty:      (*ty).clone(),
                                                 default: None, })
                       .collect();
    Type::Struct(Rc::new(StructType { name: name.to_string(),
                                      fields,
                                      bindings: TypeBindings::default() }))
}

fn function(parameters: &[&Type], return_type: &Type) -> Type {
    Type::Function(Rc::new(FunctionType { parameters:  parameters.iter().map(|ty| (*ty).clone()).collect(),
                                          return_type: return_type.clone(), }))
}

fn samples(registry: &TypeRegistry) -> Vec<Type> {
    let person = structure("Person", &[("name", &registry.string), ("age", &registry.int)]);
    vec![registry.int.clone(),
         registry.float.clone(),
         registry.string.clone(),
         registry.bool.clone(),
         registry.unit.clone(),
         Type::Collection(Rc::new(registry.int.clone())),
         Type::Map(Rc::new(MapType { key:   registry.string.clone(),
                                     value: registry.float.clone(), })),
         function(&[&registry.int], &registry.bool),
         Type::Algebraic(vec![registry.int.clone(), registry.string.clone()].into()),
         person]
}

#[test]
fn any_accepts_everything() {
    let registry = TypeRegistry::new();
    for ty in samples(&registry) {
        assert!(registry.any.accepts(&ty), "Any should accept {ty}");
    }
}

#[test]
fn only_any_accepts_any() {
    let registry = TypeRegistry::new();
    assert!(!registry.int.accepts(&registry.any));
    for ty in samples(&registry) {
        assert!(!ty.accepts(&registry.any), "{ty} should not accept Any");
    }
    assert!(registry.any.accepts(&registry.any));
}

#[test]
fn acceptance_is_reflexive() {
    let registry = TypeRegistry::new();
    for ty in samples(&registry) {
        assert!(ty.accepts(&ty), "{ty} should accept itself");
    }
}

#[test]
fn nominal_types_are_distinct() {
    let registry = TypeRegistry::new();
    assert!(!registry.int.accepts(&registry.float));
    assert!(!registry.float.accepts(&registry.int));
    assert!(!registry.string.accepts(&registry.bool));

    let other_int = Type::nominal("Int", false);
    assert!(!registry.int.accepts(&other_int));
}

#[test]
fn structs_use_width_subtyping() {
    let registry = TypeRegistry::new();
    let named = structure("Named", &[("name", &registry.string)]);
    let person = structure("Person", &[("name", &registry.string), ("age", &registry.int)]);
    let numbered = structure("Numbered", &[("name", &registry.int)]);

    assert!(named.accepts(&person));
    assert!(!person.accepts(&named));
    assert!(!named.accepts(&numbered));
}

#[test]
fn function_types_compare_parameters_and_return() {
    let registry = TypeRegistry::new();
    let int_to_bool = function(&[&registry.int], &registry.bool);

    assert!(int_to_bool.accepts(&function(&[&registry.int], &registry.bool)));
    assert!(!int_to_bool.accepts(&function(&[&registry.string], &registry.bool)));
    assert!(!int_to_bool.accepts(&function(&[&registry.int], &registry.int)));
    assert!(!int_to_bool.accepts(&function(&[&registry.int, &registry.int], &registry.bool)));
    assert!(!int_to_bool.accepts(&function(&[&registry.any], &registry.bool)));
    assert!(!int_to_bool.accepts(&function(&[&registry.int], &registry.any)));
    assert!(function(&[&registry.any], &registry.bool).accepts(&int_to_bool));
}

#[test]
fn collections_and_maps_compare_their_contents() {
    let registry = TypeRegistry::new();
    let ints = Type::Collection(Rc::new(registry.int.clone()));
    let strings = Type::Collection(Rc::new(registry.string.clone()));
    let anything = Type::Collection(Rc::new(registry.any.clone()));

    assert!(!ints.accepts(&strings));
    assert!(anything.accepts(&ints));
    assert!(!ints.accepts(&anything));
    assert!(!ints.accepts(&registry.int));

    let map = |key: &Type, value: &Type| {
        Type::Map(Rc::new(MapType { key:   key.clone(),
                                    value: value.clone(), }))
    };
    assert!(map(&registry.string, &registry.int).accepts(&map(&registry.string, &registry.int)));
    assert!(!map(&registry.string, &registry.int).accepts(&map(&registry.int, &registry.int)));
}

#[test]
fn algebraic_types() {
    let registry = TypeRegistry::new();
    let int_or_string = Type::Algebraic(vec![registry.int.clone(), registry.string.clone()].into());
    let int_or_float = Type::Algebraic(vec![registry.int.clone(), registry.float.clone()].into());

    assert!(int_or_string.accepts(&registry.int));
    assert!(int_or_string.accepts(&registry.string));
    assert!(!int_or_string.accepts(&registry.bool));
    assert!(!registry.int.accepts(&int_or_string));
    assert!(!int_or_string.accepts(&int_or_float));

    let wider = Type::Algebraic(vec![registry.int.clone(), registry.string.clone(), registry.float.clone()].into());
    assert!(wider.accepts(&int_or_string));
    assert!(wider.accepts(&int_or_float));
}

#[test]
fn type_names_render() {
    let registry = TypeRegistry::new();
    assert_eq!(registry.int.to_string(), "Int");
    assert_eq!(Type::Collection(Rc::new(registry.string.clone())).to_string(), "[String]");
    assert_eq!(structure("Person", &[]).name(), Some("Person"));
}
