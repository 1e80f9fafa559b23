use std::sync::Arc;

use pretty_assertions::assert_eq;
use xmap::prelude::*;

fn compact() -> SerializerOptions {
    SerializerOptions::default().compact()
}

fn serializer(builder: &SchemaBuilder, root: &str) -> XmlSerializer {
    let registry = Arc::new(builder.build().unwrap());
    XmlSerializer::new(registry, DataType::class(root)).with_options(compact())
}

fn person_schema() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder
        .add_enum(EnumDef::new("Role", ["Admin", "User"]).variant_alias("Admin", "admin"))
        .add_class(
            ClassDef::new("Person")
                .comment("people file")
                .member(MemberDef::new("Name", DataType::String).attribute())
                .member(MemberDef::new("Age", DataType::Int32))
                .member(MemberDef::new("Role", DataType::enumeration("Role")).attribute())
                .member(MemberDef::new("Email", DataType::String).skip_if_null()),
        );
    builder
}

fn person(name: &str, age: i32, email: Option<&str>) -> Value {
    Object::new("Person")
        .with("Name", name)
        .with("Age", age)
        .with("Role", Value::Enum(EnumValue::new("Role", "Admin")))
        .with("Email", email.map(Value::string).unwrap_or_default())
        .into_ref()
        .into()
}

#[test]
fn test_serialize_simple_object() {
    let mut ser = serializer(&person_schema(), "Person");
    let xml = ser.serialize(&person("Ada", 36, None)).unwrap();
    assert_eq!(
        xml,
        r#"<!--people file--><Person Name="Ada" Role="admin"><Age>36</Age></Person>"#
    );
    assert!(ser.errors().is_empty());
}

#[test]
fn test_round_trip_simple_object() {
    let mut ser = serializer(&person_schema(), "Person");
    let original = person("Grace", 85, Some("grace@example.com"));
    let xml = ser.serialize(&original).unwrap();
    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(back, original);
    assert!(ser.errors().is_empty());
}

#[test]
fn test_indented_output() {
    let registry = Arc::new(person_schema().build().unwrap());
    let mut ser = XmlSerializer::new(registry, DataType::class("Person"));
    let xml = ser.serialize(&person("Ada", 36, None)).unwrap();
    assert_eq!(
        xml,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!--people file-->\n<Person Name=\"Ada\" Role=\"admin\">\n  <Age>36</Age>\n</Person>"
    );
}

#[test]
fn test_locations() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Server")
            .member(MemberDef::new("Host", DataType::String).location("Network/Primary"))
            .member(MemberDef::new("Port", DataType::Int32).attribute_at("Network/Primary"))
            .member(MemberDef::new("Motd", DataType::String).text_content()),
    );
    let mut ser = serializer(&builder, "Server");

    let server: Value = Object::new("Server")
        .with("Host", "example.org")
        .with("Port", 8080)
        .with("Motd", "hello")
        .into_ref()
        .into();
    let xml = ser.serialize(&server).unwrap();
    assert_eq!(
        xml,
        r#"<Server><Network><Primary Port="8080"><Host>example.org</Host></Primary></Network>hello</Server>"#
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), server);
}

#[test]
fn test_members_escaping_their_element() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(
            ClassDef::new("Outer")
                .member(MemberDef::new("Inner", DataType::class("Inner"))),
        )
        .add_class(
            ClassDef::new("Inner").member(MemberDef::new("Id", DataType::Int32).attribute_at("..")),
        );
    let mut ser = serializer(&builder, "Outer");

    let inner = Object::new("Inner").with("Id", 7).into_ref();
    let outer: Value = Object::new("Outer").with("Inner", inner).into_ref().into();
    let xml = ser.serialize(&outer).unwrap();
    assert_eq!(xml, r#"<Outer Id="7"/>"#);

    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(back, outer);
    assert!(ser.errors().is_empty());
}

#[test]
fn test_ordering() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Ordered")
            .member(MemberDef::new("Last", DataType::Int32))
            .member(MemberDef::new("Second", DataType::Int32).order(2))
            .member(MemberDef::new("First", DataType::Int32).order(1)),
    );
    let mut ser = serializer(&builder, "Ordered");
    let value: Value = Object::new("Ordered")
        .with("Last", 3)
        .with("Second", 2)
        .with("First", 1)
        .into_ref()
        .into();
    assert_eq!(
        ser.serialize(&value).unwrap(),
        "<Ordered><First>1</First><Second>2</Second><Last>3</Last></Ordered>"
    );
}

#[test]
fn test_null_and_default_suppression() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Item")
            .member(MemberDef::new("Name", DataType::String))
            .member(MemberDef::new("Count", DataType::Int32))
            .member(MemberDef::new("Limit", DataType::Int32).default_value(10)),
    );
    let registry = Arc::new(builder.build().unwrap());
    let item: Value = Object::new("Item")
        .with("Name", Value::Null)
        .with("Count", 0)
        .with("Limit", 10)
        .into_ref()
        .into();

    let mut ser = XmlSerializer::new(registry.clone(), DataType::class("Item"))
        .with_options(compact());
    assert_eq!(
        ser.serialize(&item).unwrap(),
        "<Item><Name/><Count>0</Count><Limit>10</Limit></Item>"
    );

    let mut ser = XmlSerializer::new(registry, DataType::class("Item")).with_options(
        compact()
            .serialize_nulls(false)
            .skip_default_values(true),
    );
    let xml = ser.serialize(&item).unwrap();
    assert_eq!(xml, "<Item/>");

    // Omitted members are expected and not reported
    let back = ser.deserialize(&xml).unwrap().unwrap();
    assert_eq!(back, item);
    assert!(ser.errors().is_empty());
}

#[test]
fn test_namespaces() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Doc")
            .namespace("urn:doc", None)
            .member(MemberDef::new("Meta", DataType::String).namespace("urn:meta", Some("m")))
            .member(MemberDef::new("Body", DataType::String)),
    );
    let mut ser = serializer(&builder, "Doc");
    let doc: Value = Object::new("Doc")
        .with("Meta", "m1")
        .with("Body", "text")
        .into_ref()
        .into();

    let xml = ser.serialize(&doc).unwrap();
    assert_eq!(
        xml,
        r#"<Doc xmlns="urn:doc" xmlns:m="urn:meta"><m:Meta>m1</m:Meta><Body>text</Body></Doc>"#
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), doc);
}

#[test]
fn test_namespace_prefix_collision() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Doc")
            .member(MemberDef::new("A", DataType::String).namespace("urn:a", Some("p")))
            .member(MemberDef::new("B", DataType::String).namespace("urn:b", Some("p"))),
    );
    let registry = Arc::new(builder.build().unwrap());
    let mut ser = XmlSerializer::new(registry, DataType::class("Doc"))
        .with_options(compact().exception_policy(ExceptionPolicy::DoNotThrow));
    let doc: Value = Object::new("Doc").with("A", "1").with("B", "2").into_ref().into();

    ser.serialize(&doc).unwrap();
    assert_eq!(ser.errors().len(), 1);
    assert!(matches!(
        ser.errors().iter().next().unwrap().error,
        MappingError::NamespaceCollision { .. }
    ));
}

#[test]
fn test_text_embedding() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Note")
            .member(MemberDef::new("Body", DataType::String).embed(TextEmbedding::CData))
            .member(MemberDef::new("Secret", DataType::String).embed(TextEmbedding::Base64))
            .member(MemberDef::new("Padded", DataType::String).preserve_whitespace()),
    );
    let mut ser = serializer(&builder, "Note");
    let note: Value = Object::new("Note")
        .with("Body", "a < b")
        .with("Secret", "hi")
        .with("Padded", "  x  ")
        .into_ref()
        .into();

    let xml = ser.serialize(&note).unwrap();
    assert_eq!(
        xml,
        "<Note><Body><![CDATA[a < b]]></Body><Secret>aGk=</Secret><Padded>  x  </Padded></Note>"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), note);
}

#[test]
fn test_known_types() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Job")
            .member(MemberDef::new("Id", DataType::Guid).attribute())
            .member(MemberDef::new("Timeout", DataType::TimeSpan))
            .member(MemberDef::new("Kind", DataType::Type)),
    );
    let mut ser = serializer(&builder, "Job");
    let job: Value = Object::new("Job")
        .with("Id", Value::Guid(Guid::from_u128(0x42)))
        .with("Timeout", Value::TimeSpan(TimeSpan::from_ticks(90 * 10_000_000)))
        .with("Kind", Value::Type(DataType::list(DataType::Int32)))
        .into_ref()
        .into();

    let xml = ser.serialize(&job).unwrap();
    assert!(xml.contains("<Timeout>00:01:30</Timeout>"), "{xml}");
    assert!(xml.contains("<Kind>List&lt;Int32&gt;</Kind>"), "{xml}");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), job);

    // Durations may also be given in ticks
    let ticks = r#"<Job Id="00000000-0000-0000-0000-000000000042"><Timeout><Ticks>900000000</Ticks></Timeout><Kind>List&lt;Int32&gt;</Kind></Job>"#;
    assert_eq!(ser.deserialize(ticks).unwrap().unwrap(), job);
}

#[derive(Debug)]
struct PointConverter;

impl CustomConverter for PointConverter {
    fn to_text(&self, value: &Value) -> xmap::schema::Result<String> {
        let object = value.as_object().ok_or_else(|| {
            xmap::schema::Error::Converter("expected a point".to_string())
        })?;
        let x = object.get("X").and_then(|v| v.as_i32()).unwrap_or(0);
        let y = object.get("Y").and_then(|v| v.as_i32()).unwrap_or(0);
        Ok(format!("{x};{y}"))
    }

    fn from_text(&self, text: &str) -> xmap::schema::Result<Value> {
        let (x, y) = text
            .split_once(';')
            .ok_or_else(|| xmap::schema::Error::Converter(format!("bad point '{text}'")))?;
        let parse = |s: &str| {
            s.trim()
                .parse::<i32>()
                .map_err(|e| xmap::schema::Error::Converter(e.to_string()))
        };
        Ok(Object::new("Point")
            .with("X", parse(x)?)
            .with("Y", parse(y)?)
            .into_ref()
            .into())
    }
}

#[test]
fn test_custom_converter() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(
            ClassDef::new("Point")
                .member(MemberDef::new("X", DataType::Int32))
                .member(MemberDef::new("Y", DataType::Int32)),
        )
        .add_class(
            ClassDef::new("Shape")
                .member(
                    MemberDef::new("Origin", DataType::class("Point"))
                        .attribute()
                        .converter(Arc::new(PointConverter)),
                )
                .member(
                    MemberDef::new("End", DataType::class("Point"))
                        .converter(Arc::new(PointConverter)),
                ),
        );
    let mut ser = serializer(&builder, "Shape");
    let point = |x: i32, y: i32| Object::new("Point").with("X", x).with("Y", y).into_ref();
    let shape: Value = Object::new("Shape")
        .with("Origin", point(1, 2))
        .with("End", point(3, 4))
        .into_ref()
        .into();

    let xml = ser.serialize(&shape).unwrap();
    assert_eq!(xml, r#"<Shape Origin="1;2"><End>3;4</End></Shape>"#);
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), shape);
}

#[test]
fn test_read_only_members_are_not_assigned() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Counter")
            .member(MemberDef::new("Total", DataType::Int32).read_only())
            .member(MemberDef::new("Step", DataType::Int32)),
    );
    let mut ser = serializer(&builder, "Counter");
    let back = ser
        .deserialize("<Counter><Total>99</Total><Step>2</Step></Counter>")
        .unwrap()
        .unwrap();
    let counter = back.as_object().unwrap();
    assert_eq!(counter.get("Total"), Some(Value::Int32(0)));
    assert_eq!(counter.get("Step"), Some(Value::Int32(2)));
}

#[test]
fn test_serialize_to_writer() {
    let mut ser = serializer(&person_schema(), "Person");
    let mut out = Vec::new();
    ser.serialize_to_writer(&person("Ada", 36, None), &mut out).unwrap();
    let xml = String::from_utf8(out).unwrap();
    assert!(xml.starts_with("<!--people file--><Person"));

    let mut doc = ser.serialize_to_document(&person("Ada", 36, None)).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.local_name(root), "Person");
    let back = ser.deserialize_document(&mut doc).unwrap().unwrap();
    assert_eq!(back, person("Ada", 36, None));
}

#[test]
fn test_empty_text_of_value_types() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Item")
            .member(MemberDef::new("Name", DataType::String))
            .member(MemberDef::new("Count", DataType::Int32)),
    );
    let registry = Arc::new(builder.build().unwrap());
    let mut ser = XmlSerializer::new(registry, DataType::class("Item"))
        .with_options(compact().exception_policy(ExceptionPolicy::DoNotThrow));

    let back = ser
        .deserialize("<Item><Name/><Count/></Item>")
        .unwrap()
        .unwrap();
    let item = back.as_object().unwrap();
    assert_eq!(item.get("Name"), Some(Value::Null));
    assert_eq!(item.get("Count"), Some(Value::Int32(0)));
    assert_eq!(ser.errors().len(), 1);
    assert_eq!(
        ser.errors().of_category(ErrorCategory::MalformedValue).count(),
        1
    );

    ser.options_mut().exception_policy = ExceptionPolicy::ThrowErrorsOnly;
    let err = ser.deserialize("<Item><Name/><Count/></Item>").unwrap_err();
    assert!(matches!(
        err,
        Error::Aborted(ref r) if matches!(r.error, MappingError::MalformedValue { .. })
    ));
}

#[test]
fn test_blank_instance_is_not_null() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(ClassDef::new("Inner").member(MemberDef::new("Label", DataType::String)))
        .add_class(
            ClassDef::new("Outer").member(MemberDef::new("Inner", DataType::class("Inner"))),
        );
    let registry = Arc::new(builder.build().unwrap());
    let inner = Object::new("Inner").with("Label", Value::Null).into_ref();
    let outer: Value = Object::new("Outer").with("Inner", inner).into_ref().into();

    // Without nulls an instance with only null members writes an empty element
    let mut ser = XmlSerializer::new(registry.clone(), DataType::class("Outer"))
        .with_options(compact().serialize_nulls(false));
    let xml = ser.serialize(&outer).unwrap();
    assert_eq!(xml, "<Outer><Inner/></Outer>");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), outer);
    assert!(ser.errors().is_empty());

    // With nulls the same element can only be a null member
    let mut ser = XmlSerializer::new(registry, DataType::class("Outer")).with_options(compact());
    let empty: Value = Object::new("Outer").with("Inner", Value::Null).into_ref().into();
    let xml = ser.serialize(&empty).unwrap();
    assert_eq!(xml, "<Outer><Inner/></Outer>");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), empty);
}

#[test]
fn test_blank_instance_with_skipped_members() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(
            ClassDef::new("Inner")
                .member(MemberDef::new("Label", DataType::String).skip_if_null()),
        )
        .add_class(
            ClassDef::new("Outer").member(MemberDef::new("Inner", DataType::class("Inner"))),
        );
    let registry = Arc::new(builder.build().unwrap());
    let mut ser =
        XmlSerializer::new(registry, DataType::class("Outer")).with_options(compact());
    let inner = Object::new("Inner").with("Label", Value::Null).into_ref();
    let outer: Value = Object::new("Outer").with("Inner", inner).into_ref().into();

    let xml = ser.serialize(&outer).unwrap();
    assert_eq!(xml, "<Outer><Inner/></Outer>");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), outer);
}
