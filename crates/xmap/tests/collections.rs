use std::sync::Arc;

use pretty_assertions::assert_eq;
use xmap::prelude::*;

fn serializer(builder: &SchemaBuilder, root: &str, options: SerializerOptions) -> XmlSerializer {
    let registry = Arc::new(builder.build().unwrap());
    XmlSerializer::new(registry, DataType::class(root)).with_options(options.compact())
}

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::from).collect()
}

#[test]
fn test_recursive_list() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Bag").member(MemberDef::new("Numbers", DataType::list(DataType::Int32))),
    );
    let mut ser = serializer(&builder, "Bag", SerializerOptions::default());
    let bag: Value = Object::new("Bag")
        .with("Numbers", Value::Sequence(Sequence::list(DataType::Int32, ints(&[1, 2, 3]))))
        .into_ref()
        .into();

    let xml = ser.serialize(&bag).unwrap();
    assert_eq!(
        xml,
        "<Bag><Numbers><Int32>1</Int32><Int32>2</Int32><Int32>3</Int32></Numbers></Bag>"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), bag);
}

#[test]
fn test_serial_collections() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Bag")
            .member(
                MemberDef::new("Ids", DataType::list(DataType::Int32))
                    .attribute()
                    .collection(CollectionConfig::serial(" ")),
            )
            .member(
                MemberDef::new("Numbers", DataType::list(DataType::Int32))
                    .collection(CollectionConfig::serial(",")),
            ),
    );
    let mut ser = serializer(&builder, "Bag", SerializerOptions::default());
    let bag: Value = Object::new("Bag")
        .with("Ids", Value::Sequence(Sequence::list(DataType::Int32, ints(&[1, 2, 3]))))
        .with("Numbers", Value::Sequence(Sequence::list(DataType::Int32, ints(&[4, 5]))))
        .into_ref()
        .into();

    let xml = ser.serialize(&bag).unwrap();
    assert_eq!(xml, r#"<Bag Ids="1 2 3"><Numbers>4,5</Numbers></Bag>"#);
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), bag);

    // Empty tokens are skipped and surrounding whitespace trimmed
    let loose = r#"<Bag Ids="  1   2 3 "><Numbers>4, ,5,</Numbers></Bag>"#;
    assert_eq!(ser.deserialize(loose).unwrap().unwrap(), bag);
    assert!(ser.errors().is_empty());
}

#[test]
fn test_serial_whitespace_separates() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Bag").member(
            MemberDef::new("Numbers", DataType::list(DataType::Int32))
                .collection(CollectionConfig::serial(";").whitespace_separates()),
        ),
    );
    let mut ser = serializer(&builder, "Bag", SerializerOptions::default());
    let back = ser
        .deserialize("<Bag><Numbers>1;2 3\n4</Numbers></Bag>")
        .unwrap()
        .unwrap();
    let numbers = back.as_object().unwrap().get("Numbers").unwrap();
    assert_eq!(
        numbers,
        Value::Sequence(Sequence::list(DataType::Int32, ints(&[1, 2, 3, 4])))
    );
}

#[test]
fn test_no_container_collection() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Post")
            .member(MemberDef::new("Title", DataType::String))
            .member(
                MemberDef::new("Tags", DataType::list(DataType::String))
                    .collection(CollectionConfig::no_container().item_name("Tag")),
            ),
    );
    let mut ser = serializer(&builder, "Post", SerializerOptions::default());
    let tags = Sequence::list(DataType::String, ["a".into(), "b".into()]);
    let post: Value = Object::new("Post")
        .with("Title", "hello")
        .with("Tags", Value::Sequence(tags))
        .into_ref()
        .into();

    let xml = ser.serialize(&post).unwrap();
    assert_eq!(xml, "<Post><Title>hello</Title><Tag>a</Tag><Tag>b</Tag></Post>");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), post);
}

#[test]
fn test_stack_keeps_its_order() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(ClassDef::new("Undo").member(MemberDef::new(
        "Steps",
        DataType::sequence(SequenceKind::Stack, DataType::Int32),
    )));
    let mut ser = serializer(&builder, "Undo", SerializerOptions::default());
    let steps = Sequence::from_items(SequenceKind::Stack, DataType::Int32, ints(&[1, 2, 3]));
    let undo: Value = Object::new("Undo")
        .with("Steps", Value::Sequence(steps))
        .into_ref()
        .into();

    let xml = ser.serialize(&undo).unwrap();
    assert_eq!(
        xml,
        "<Undo><Steps><Int32>3</Int32><Int32>2</Int32><Int32>1</Int32></Steps></Undo>"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), undo);
}

#[test]
fn test_set_duplicate_is_a_warning() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(ClassDef::new("Bag").member(MemberDef::new(
        "Names",
        DataType::sequence(SequenceKind::Set, DataType::String),
    )));
    let mut ser = serializer(&builder, "Bag", SerializerOptions::default());
    let back = ser
        .deserialize("<Bag><Names><String>a</String><String>a</String></Names></Bag>")
        .unwrap()
        .unwrap();

    let names = back.as_object().unwrap().get("Names").unwrap();
    assert_eq!(names.as_sequence().map(Sequence::len), Some(1));
    assert_eq!(ser.errors().len(), 1);
    let entry = ser.errors().iter().next().unwrap();
    assert_eq!(entry.severity, Severity::Warning);
    assert_eq!(entry.error.category(), ErrorCategory::Structural);
    assert!(matches!(entry.error, MappingError::InsertionFailure { .. }));
}

fn grid_schema() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Board").member(MemberDef::new("Grid", DataType::array(DataType::Int32, 2))),
    );
    builder
}

fn board() -> Value {
    let grid = Array::with_dims(DataType::Int32, vec![2, 3], ints(&[1, 2, 3, 4, 5, 6])).unwrap();
    Object::new("Board")
        .with("Grid", Value::Array(grid))
        .into_ref()
        .into()
}

#[test]
fn test_multi_dimensional_array() {
    let mut ser = serializer(&grid_schema(), "Board", SerializerOptions::default());
    let xml = ser.serialize(&board()).unwrap();
    assert!(xml.contains(r#"xmap:dims="2,3""#), "{xml}");
    assert!(xml.contains(r#"xmlns:xmap="urn:xmap:metadata""#), "{xml}");
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), board());
}

#[test]
fn test_array_without_metadata_is_flattened() {
    let options = SerializerOptions::default().suppress_metadata(true);
    let mut ser = serializer(&grid_schema(), "Board", options);
    let xml = ser.serialize(&board()).unwrap();
    assert!(!xml.contains("dims"), "{xml}");

    let back = ser.deserialize(&xml).unwrap().unwrap();
    let grid = back.as_object().unwrap().get("Grid").unwrap();
    let Value::Array(grid) = &grid else {
        panic!("expected an array, got {grid:?}");
    };
    assert_eq!(grid.dims(), &[6, 1]);
    assert_eq!(grid.items(), ints(&[1, 2, 3, 4, 5, 6]).as_slice());
}

fn scores(entries: &[(&str, i32)]) -> Value {
    let mut map = Map::new(DataType::String, DataType::Int32);
    for (key, value) in entries {
        map.insert(Value::from(*key), Value::from(*value)).unwrap();
    }
    Value::Map(map)
}

#[test]
fn test_dictionary_default_layout() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(ClassDef::new("Game").member(MemberDef::new(
        "Scores",
        DataType::map(DataType::String, DataType::Int32),
    )));
    let mut ser = serializer(&builder, "Game", SerializerOptions::default());
    let game: Value = Object::new("Game")
        .with("Scores", scores(&[("a", 1), ("b", 2)]))
        .into_ref()
        .into();

    let xml = ser.serialize(&game).unwrap();
    assert_eq!(
        xml,
        "<Game><Scores><Entry><Key>a</Key><Value>1</Value></Entry><Entry><Key>b</Key><Value>2</Value></Entry></Scores></Game>"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), game);
}

#[test]
fn test_dictionary_custom_layout() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Game").member(
            MemberDef::new("Scores", DataType::map(DataType::String, DataType::Int32)).dictionary(
                DictionaryConfig::default()
                    .entry_name("Score")
                    .key(NodePlacement::Attribute, "name")
                    .value(NodePlacement::Content, "value")
                    .formats(None, Some("D3")),
            ),
        ),
    );
    let mut ser = serializer(&builder, "Game", SerializerOptions::default());
    let game: Value = Object::new("Game")
        .with("Scores", scores(&[("a", 1), ("b", 20)]))
        .into_ref()
        .into();

    let xml = ser.serialize(&game).unwrap();
    assert_eq!(
        xml,
        r#"<Game><Scores><Score name="a">001</Score><Score name="b">020</Score></Scores></Game>"#
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), game);
}

#[test]
fn test_dictionary_missing_key() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(ClassDef::new("Game").member(MemberDef::new(
        "Scores",
        DataType::map(DataType::String, DataType::Int32),
    )));
    let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
    let mut ser = serializer(&builder, "Game", options);
    let back = ser
        .deserialize("<Game><Scores><Entry><Value>1</Value></Entry><Entry><Key>b</Key><Value>2</Value></Entry></Scores></Game>")
        .unwrap()
        .unwrap();

    assert_eq!(back.as_object().unwrap().get("Scores"), Some(scores(&[("b", 2)])));
    assert_eq!(ser.errors().of_category(ErrorCategory::MissingValue).count(), 1);
}

#[test]
fn test_collection_class() {
    let mut builder = SchemaBuilder::new();
    builder
        .add_class(ClassDef::new("Playlist").collection_of(DataType::String))
        .add_class(
            ClassDef::new("Player").member(MemberDef::new("Songs", DataType::class("Playlist"))),
        );
    let mut ser = serializer(&builder, "Player", SerializerOptions::default());
    let playlist = Object::new("Playlist").with_item("x").with_item("y").into_ref();
    let player: Value = Object::new("Player").with("Songs", playlist).into_ref().into();

    let xml = ser.serialize(&player).unwrap();
    assert_eq!(
        xml,
        "<Player><Songs><String>x</String><String>y</String></Songs></Player>"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), player);
}

#[test]
fn test_array_without_container_keeps_dims() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Board").member(
            MemberDef::new("Grid", DataType::array(DataType::Int32, 2))
                .collection(CollectionConfig::no_container()),
        ),
    );
    let mut ser = serializer(&builder, "Board", SerializerOptions::default());
    let xml = ser.serialize(&board()).unwrap();
    assert!(!xml.contains("<Grid"), "{xml}");
    assert!(
        xml.contains(r#"<Int32 xmap:dims="2,3">1</Int32><Int32>2</Int32>"#),
        "{xml}"
    );
    assert_eq!(ser.deserialize(&xml).unwrap().unwrap(), board());
}

#[test]
fn test_dictionary_key_attribute_in_any_order() {
    let mut builder = SchemaBuilder::new();
    builder.add_class(
        ClassDef::new("Game").member(
            MemberDef::new("Scores", DataType::map(DataType::String, DataType::Int32))
                .dictionary(DictionaryConfig::default().key(NodePlacement::Attribute, "id")),
        ),
    );
    let mut ser = serializer(&builder, "Game", SerializerOptions::default());
    let game: Value = Object::new("Game")
        .with("Scores", scores(&[("a", 1), ("b", 2)]))
        .into_ref()
        .into();

    let xml = ser.serialize(&game).unwrap();
    assert_eq!(
        xml,
        r#"<Game><Scores><Entry id="a"><Value>1</Value></Entry><Entry id="b"><Value>2</Value></Entry></Scores></Game>"#
    );

    let shuffled = r#"<Game><Scores><Entry id="b"><Value>2</Value></Entry><Entry id="a"><Value>1</Value></Entry></Scores></Game>"#;
    assert_eq!(ser.deserialize(shuffled).unwrap().unwrap(), game);
    assert!(ser.errors().is_empty());
}
