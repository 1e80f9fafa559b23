use std::sync::Arc;

use pretty_assertions::assert_eq;
use xmap::prelude::*;

fn build(builder: &SchemaBuilder, root: &str, options: SerializerOptions) -> XmlSerializer {
    let registry = Arc::new(builder.build().unwrap());
    XmlSerializer::new(registry, DataType::class(root)).with_options(options.compact())
}

fn zoo_schema(alias_dogs: bool) -> SchemaBuilder {
    let mut animals = MemberDef::new("Animals", DataType::list(DataType::class("Animal")));
    if alias_dogs {
        animals = animals.type_alias(DataType::class("Dog"), "DogPet");
    }
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(ClassDef::new("Animal").member(MemberDef::new("Name", DataType::String).attribute()))
        .add_class(
            ClassDef::new("Dog")
                .base("Animal")
                .member(MemberDef::new("Breed", DataType::String)),
        )
        .add_class(ClassDef::new("Zoo").member(animals));
    builder
}

fn zoo() -> Value {
    let cat = Object::new("Animal").with("Name", "c").into_ref();
    let dog = Object::new("Dog").with("Name", "d").with("Breed", "lab").into_ref();
    let animals = Sequence::list(DataType::class("Animal"), [cat.into(), dog.into()]);
    Object::new("Zoo")
        .with("Animals", Value::Sequence(animals))
        .into_ref()
        .into()
}

fn animal_classes(value: &Value) -> Vec<String> {
    let animals = value.as_object().unwrap().get("Animals").unwrap();
    animals
        .as_sequence()
        .unwrap()
        .iter()
        .map(|a| a.as_object().unwrap().class_name().to_string())
        .collect()
}

#[test]
fn test_polymorphic_items_carry_their_type() {
    let mut ser = build(&zoo_schema(false), "Zoo", SerializerOptions::default());
    let xml = ser.serialize(&zoo()).unwrap();
    assert!(xml.contains(r#"<Animal Name="c"/>"#), "{xml}");
    assert!(xml.contains(r#"xmap:realtype="Dog""#), "{xml}");
    assert!(xml.contains("<Breed>lab</Breed>"), "{xml}");

    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(back, zoo());
    assert_eq!(animal_classes(&back), ["Animal", "Dog"]);
}

#[test]
fn test_type_alias_replaces_the_marker() {
    let mut ser = build(&zoo_schema(true), "Zoo", SerializerOptions::default());
    let xml = ser.serialize(&zoo()).unwrap();
    assert!(xml.contains("<DogPet"), "{xml}");
    assert!(!xml.contains("realtype"), "{xml}");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), zoo());
}

#[test]
fn test_suppressed_metadata_reads_declared_type() {
    let options = SerializerOptions::default().suppress_metadata(true);
    let mut ser = build(&zoo_schema(false), "Zoo", options);
    let xml = ser.serialize(&zoo()).unwrap();
    assert!(!xml.contains("realtype"), "{xml}");

    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(animal_classes(&back), ["Animal", "Animal"]);
}

#[test]
fn test_unresolved_type_marker() {
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = build(&zoo_schema(false), "Zoo", options);
    let xml = r#"<Zoo xmlns:xmap="urn:xmap:metadata"><Animals><Animal xmap:realtype="Unicorn" Name="u"/></Animals></Zoo>"#;

    let back = ser.deserialize(xml).unwrap().unwrap();
    assert_eq!(animal_classes(&back), ["Animal"]);
    assert!(matches!(
        ser.errors().iter().next().map(|e| &e.error),
        Some(MappingError::UnresolvedType { name }) if name == "Unicorn"
    ));
}

#[test]
fn test_any_member_records_runtime_type() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(ClassDef::new("Box").member(MemberDef::new("Payload", DataType::Any)));
    let mut ser = build(&builder, "Box", SerializerOptions::default());
    let boxed: Value = Object::new("Box").with("Payload", 5).into_ref().into();

    let xml = ser.serialize(&boxed).unwrap();
    assert!(xml.contains(r#"<Payload xmap:realtype="Int32">5</Payload>"#), "{xml}");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), boxed);
}

fn node_schema() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Node")
            .member(MemberDef::new("Name", DataType::String).attribute())
            .member(MemberDef::new("Next", DataType::class("Node"))),
    );
    builder
}

fn node(name: &str) -> ObjectRef {
    Object::new("Node").with("Name", name).with("Next", Value::Null).into_ref()
}

#[test]
fn test_tolerated_cycle_writes_placeholder() {
    let mut ser = build(&node_schema(), "Node", SerializerOptions::default());
    let a = node("a");
    a.set("Next", a.clone());

    let xml = ser.serialize(&a.clone().into()).unwrap();
    assert_eq!(xml, r#"<Node Name="a"><Next/></Node>"#);

    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(back.as_object().unwrap().get("Next"), Some(Value::Null));
}

#[test]
fn test_untolerated_cycle_aborts() {
    let options = SerializerOptions::default().tolerate_cycles(false);
    let mut ser = build(&node_schema(), "Node", options);
    let a = node("a");
    let b = node("b");
    a.set("Next", b.clone());
    b.set("Next", a.clone());

    let err = ser.serialize(&a.into()).unwrap_err();
    assert!(matches!(err, Error::SelfReference { ref class } if class == "Node"));
}

#[test]
fn test_recursion_limit() {
    let options = SerializerOptions::default().max_recursion(2);
    let mut ser = build(&node_schema(), "Node", options);
    let a = node("a");
    let b = node("b");
    let c = node("c");
    a.set("Next", b.clone());
    b.set("Next", c);

    let xml = ser.serialize(&a.into()).unwrap();
    assert_eq!(xml, r#"<Node Name="a"><Next Name="b"><Next/></Next></Node>"#);
}

fn person_schema(age_severity: Option<Severity>) -> SchemaBuilder {
    let mut age = MemberDef::new("Age", DataType::Int32);
    if let Some(severity) = age_severity {
        age = age.severity(severity);
    }
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Person")
            .member(MemberDef::new("Name", DataType::String).attribute())
            .member(age),
    );
    builder
}

#[test]
fn test_missing_element_aborts_by_default() {
    let mut ser = build(&person_schema(None), "Person", SerializerOptions::default());
    let err = ser.deserialize(r#"<Person Name="Ada"/>"#).unwrap_err();
    let Error::Aborted(reported) = err else {
        panic!("expected an abort, got {err:?}");
    };
    assert_eq!(reported.severity, Severity::Error);
    assert_eq!(reported.error.category(), ErrorCategory::MissingValue);
    assert_eq!(ser.errors().len(), 1);
}

#[test]
fn test_member_severity_downgrades() {
    let mut ser = build(
        &person_schema(Some(Severity::Warning)),
        "Person",
        SerializerOptions::default(),
    );
    let back = ser.deserialize(r#"<Person Name="Ada"/>"#).unwrap().unwrap();
    assert_eq!(back.as_object().unwrap().get("Name"), Some(Value::from("Ada")));
    assert_eq!(ser.errors().warnings().count(), 1);
    assert!(!ser.errors().has_errors());

    // The same warning aborts under the strictest policy
    ser.options_mut().exception_policy = ExceptionPolicy::ThrowWarningsAndErrors;
    assert!(ser.deserialize(r#"<Person Name="Ada"/>"#).is_err());

    let mut ser = build(
        &person_schema(Some(Severity::Ignore)),
        "Person",
        SerializerOptions::default(),
    );
    ser.deserialize(r#"<Person Name="Ada"/>"#).unwrap().unwrap();
    assert!(ser.errors().is_empty());
}

#[test]
fn test_do_not_throw_collects_everything() {
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = build(&person_schema(None), "Person", options);
    let back = ser
        .deserialize("<Person><Age>abc</Age></Person>")
        .unwrap()
        .unwrap();

    assert_eq!(back.as_object().unwrap().get("Age"), Some(Value::Int32(0)));
    let categories: Vec<ErrorCategory> = ser.errors().iter().map(|e| e.error.category()).collect();
    assert_eq!(
        categories,
        [ErrorCategory::MissingValue, ErrorCategory::MalformedValue]
    );
}

#[test]
fn test_malformed_document() {
    let mut ser = build(&person_schema(None), "Person", SerializerOptions::default());
    let err = ser.deserialize("<Person><Age>").unwrap_err();
    assert!(matches!(
        err,
        Error::Aborted(ref r) if matches!(r.error, MappingError::MalformedDocument { .. })
    ));

    ser.options_mut().exception_policy = ExceptionPolicy::DoNotThrow;
    assert_eq!(ser.deserialize("<Person><Age>").unwrap(), None);
    assert_eq!(ser.errors().len(), 1);
}

#[derive(Debug)]
struct Shout;

impl CustomConverter for Shout {
    fn to_text(&self, value: &Value) -> xmap::schema::Result<String> {
        Ok(value.to_string())
    }

    fn from_text(&self, text: &str) -> xmap::schema::Result<Value> {
        Ok(Value::string(text.to_uppercase()))
    }
}

#[test]
fn test_assignment_failure() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Counter")
            .member(MemberDef::new("Count", DataType::Int32).converter(Arc::new(Shout))),
    );
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = build(&builder, "Counter", options);
    let back = ser
        .deserialize("<Counter><Count>ten</Count></Counter>")
        .unwrap()
        .unwrap();

    assert_eq!(back.as_object().unwrap().get("Count"), Some(Value::Int32(0)));
    assert_eq!(
        ser.errors().of_category(ErrorCategory::AssignmentFailure).count(),
        1
    );
}

#[test]
fn test_resume_across_documents() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Profile")
            .member(MemberDef::new("Name", DataType::String).severity(Severity::Ignore))
            .member(MemberDef::new("Age", DataType::Int32).severity(Severity::Ignore))
            .member(MemberDef::new("City", DataType::String).severity(Severity::Ignore)),
    );
    let mut ser = build(&builder, "Profile", SerializerOptions::default());

    let profile = ser
        .deserialize("<Profile><Name>Ada</Name><City>London</City></Profile>")
        .unwrap()
        .unwrap();
    ser.set_base_object(profile.clone());
    let merged = ser
        .deserialize("<Profile><Age>36</Age><City>Paris</City></Profile>")
        .unwrap()
        .unwrap();

    let (Value::Class(first), Value::Class(second)) = (&profile, &merged) else {
        panic!("expected objects");
    };
    assert!(first.ptr_eq(second));
    assert_eq!(second.get("Name"), Some(Value::from("Ada")));
    assert_eq!(second.get("Age"), Some(Value::Int32(36)));
    assert_eq!(second.get("City"), Some(Value::from("Paris")));

    ser.clear_base_object();
    let fresh = ser.deserialize("<Profile><Age>1</Age></Profile>").unwrap().unwrap();
    assert_eq!(fresh.as_object().unwrap().get("Name"), Some(Value::Null));
}

#[test]
fn test_self_reference_under_a_low_recursion_limit() {
    let options = SerializerOptions::default()
        .tolerate_cycles(false)
        .max_recursion(1);
    let mut ser = build(&node_schema(), "Node", options);
    let a = node("a");
    a.set("Next", a.clone());

    let err = ser.serialize(&a.into()).unwrap_err();
    assert!(matches!(err, Error::SelfReference { ref class } if class == "Node"));
}

fn home_schema() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(
            ClassDef::new("Animal")
                .not_instantiable()
                .member(MemberDef::new("Name", DataType::String).attribute()),
        )
        .add_class(
            ClassDef::new("Dog")
                .base("Animal")
                .member(MemberDef::new("Breed", DataType::String)),
        )
        .add_class(ClassDef::new("Home").member(MemberDef::new("Pet", DataType::class("Animal"))));
    builder
}

#[test]
fn test_abstract_member_needs_a_real_type() {
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = build(&home_schema(), "Home", options);
    let dog = Object::new("Dog").with("Name", "rex").with("Breed", "lab").into_ref();
    let home: Value = Object::new("Home").with("Pet", dog).into_ref().into();

    let xml = ser.serialize(&home).unwrap();
    assert!(xml.contains(r#"xmap:realtype="Dog""#), "{xml}");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), home);
    assert!(ser.errors().is_empty());

    let back = ser
        .deserialize(r#"<Home><Pet Name="x"/></Home>"#)
        .unwrap()
        .unwrap();
    assert_eq!(back.as_object().unwrap().get("Pet"), Some(Value::Null));
    assert!(matches!(
        ser.errors().iter().next().map(|e| &e.error),
        Some(MappingError::NotInstantiable { type_name }) if type_name == "Animal"
    ));

    // A null member needs no instance
    ser.deserialize("<Home><Pet/></Home>").unwrap().unwrap();
    assert!(ser.errors().is_empty());
}

#[test]
fn test_abstract_root_is_rejected() {
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = build(&home_schema(), "Animal", options);
    assert_eq!(ser.deserialize(r#"<Animal Name="x"/>"#).unwrap(), None);
    assert_eq!(ser.errors().len(), 1);

    let dog = ser
        .deserialize(r#"<Animal xmlns:xmap="urn:xmap:metadata" xmap:realtype="Dog" Name="x"><Breed>lab</Breed></Animal>"#)
        .unwrap()
        .unwrap();
    assert_eq!(dog.as_object().unwrap().class_name().to_string(), "Dog");
}
