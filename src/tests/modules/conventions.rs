use std::collections::HashMap;

use pretty_assertions::assert_eq;

use crate::{
    Bson,
    Registry,
    bson_class,
    bson_enum,
    conventions::{
        CamelCaseElementNameConvention,
        ConventionPack,
        DEFAULT_PACK,
        DelegateConvention,
        DictionaryRepresentationConvention,
        EnumRepresentationConvention,
        GuidRepresentationConvention,
        IgnoreExtraElementsConvention,
        IgnoreIfDefaultConvention,
        IgnoreIfNullConvention,
        NoIdMemberConvention,
        UnderscoreElementNameConvention,
    },
    doc,
    serializers::DictionaryRepresentation,
    spec::{BinarySubtype, ElementType},
    tests::LOCK,
    uuid::{Uuid, UuidRepresentation},
};

bson_enum! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum Level {
        #[default]
        Low = 1,
        High = 2,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Sample {
    id: i32,
    display_name: String,
    level: Level,
    token: Uuid,
    counts: HashMap<String, i32>,
    note: Option<String>,
}
bson_class!(Sample { id, display_name, level, token, counts, note });

fn sample() -> Sample {
    Sample {
        id: 7,
        display_name: "s".into(),
        level: Level::High,
        token: Uuid::from_bytes([0x11; 16]),
        counts: HashMap::from([("a".to_string(), 1)]),
        note: None,
    }
}

fn register(registry: &Registry, name: &str, f: impl FnOnce(&mut ConventionPack)) {
    let mut pack = ConventionPack::new();
    f(&mut pack);
    registry.conventions().register(name, pack, |_| true);
}

#[test]
fn default_conventions() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    assert_eq!(registry.conventions().names(), [DEFAULT_PACK]);

    let doc = registry.to_document(&sample()).unwrap();
    assert_eq!(
        doc,
        doc! {
            "_id": 7,
            "display_name": "s",
            "level": 2,
            "token": Bson::Binary(crate::Binary::from_uuid(Uuid::from_bytes([0x11; 16]))),
            "counts": { "a": 1 },
            "note": null,
        }
    );
    assert_eq!(registry.from_document::<Sample>(doc).unwrap(), sample());
}

#[test]
fn element_name_conventions() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "camel", |p| {
        p.add(CamelCaseElementNameConvention);
    });
    let doc = registry.to_document(&sample()).unwrap();
    assert!(doc.contains_key("displayName"));
    assert!(doc.contains_key("_id"));

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Upper {
        #[allow(non_snake_case)]
        HomeTown: String,
    }
    bson_class!(Upper { HomeTown });

    let registry = Registry::new();
    register(&registry, "underscore", |p| {
        p.add(UnderscoreElementNameConvention);
    });
    let doc = registry
        .to_document(&Upper {
            HomeTown: "Oslo".into(),
        })
        .unwrap();
    assert_eq!(doc, doc! { "home_town": "Oslo" });
}

#[test]
fn later_packs_win_and_replacement_keeps_position() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "first", |p| {
        p.add(CamelCaseElementNameConvention);
    });
    register(&registry, "second", |p| {
        p.add(DelegateConvention::new("shout", |class| {
            for member in class.members_mut() {
                let name = member.name().to_uppercase();
                member.set_element_name(name);
            }
        }));
    });
    assert_eq!(registry.conventions().names(), [DEFAULT_PACK, "first", "second"]);

    let doc = registry.to_document(&sample()).unwrap();
    assert!(doc.contains_key("DISPLAY_NAME"), "{doc}");
    // the id element name is fixed
    assert!(doc.contains_key("_id"), "{doc}");

    // replacing "first" keeps it ahead of "second"
    let registry = Registry::new();
    register(&registry, "first", |_| {});
    register(&registry, "second", |p| {
        p.add(CamelCaseElementNameConvention);
    });
    register(&registry, "first", |p| {
        p.add(UnderscoreElementNameConvention);
    });
    assert_eq!(registry.conventions().names(), [DEFAULT_PACK, "first", "second"]);
    let doc = registry.to_document(&sample()).unwrap();
    assert!(doc.contains_key("displayName"), "{doc}");
}

#[test]
fn filters_and_removal() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry.conventions().register(
        "only others",
        {
            let mut pack = ConventionPack::new();
            pack.add(CamelCaseElementNameConvention);
            pack
        },
        |t| t.short_name() != "Sample",
    );
    let doc = registry.to_document(&sample()).unwrap();
    assert!(doc.contains_key("display_name"));

    assert!(registry.conventions().remove("only others"));
    assert!(!registry.conventions().remove("only others"));
    assert_eq!(registry.conventions().names(), [DEFAULT_PACK]);
}

#[test]
fn removing_the_defaults() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    assert!(registry.conventions().remove(DEFAULT_PACK));
    // nothing is mapped without the member finder
    assert_eq!(registry.to_document(&sample()).unwrap(), doc! {});
}

#[test]
fn no_id_member() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "no id", |p| {
        p.add(NoIdMemberConvention);
    });
    let class_map = registry.lookup_class_map::<Sample>().unwrap();
    assert!(class_map.id_member_map().is_none());
    let doc = registry.to_document(&sample()).unwrap();
    assert_eq!(doc.get("id"), Some(&Bson::Int32(7)));
    assert!(!doc.contains_key("_id"));
}

#[test]
fn representation_conventions() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "representations", |p| {
        p.add(EnumRepresentationConvention::new(ElementType::String).unwrap())
            .add(GuidRepresentationConvention(UuidRepresentation::CSharpLegacy))
            .add(DictionaryRepresentationConvention(
                DictionaryRepresentation::ArrayOfDocuments,
            ));
    });

    let doc = registry.to_document(&sample()).unwrap();
    assert_eq!(doc.get("level"), Some(&Bson::String("High".into())));
    match doc.get("token") {
        Some(Bson::Binary(binary)) => assert_eq!(binary.subtype, BinarySubtype::UuidOld),
        other => panic!("expected binary, got {other:?}"),
    }
    assert_eq!(
        doc.get("counts"),
        Some(&Bson::Array(vec![Bson::Document(doc! { "k": "a", "v": 1 })]))
    );
    assert_eq!(registry.from_document::<Sample>(doc).unwrap(), sample());
}

#[test]
fn enum_representation_is_validated() {
    let _guard = LOCK.run_concurrently();
    assert!(EnumRepresentationConvention::new(ElementType::Double).is_err());
    assert_eq!(
        EnumRepresentationConvention::new(ElementType::Int64)
            .unwrap()
            .representation(),
        ElementType::Int64
    );
}

#[test]
fn ignore_conventions() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "ignore", |p| {
        p.add(IgnoreIfNullConvention(true))
            .add(IgnoreIfDefaultConvention(true))
            .add(IgnoreExtraElementsConvention(true));
    });

    let empty = Sample {
        id: 1,
        ..Default::default()
    };
    assert_eq!(registry.to_document(&empty).unwrap(), doc! { "_id": 1 });

    let read: Sample = registry
        .from_document(doc! { "_id": 1, "unknown": true })
        .unwrap();
    assert_eq!(read, empty);
}

#[test]
fn explicit_settings_survive_conventions() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "ignore", |p| {
        p.add(IgnoreIfNullConvention(true));
    });
    registry
        .register_class_map::<Sample>(|cm| {
            cm.auto_map();
            cm.map_member("note").set_ignore_if_null(false);
        })
        .unwrap();
    let doc = registry.to_document(&Sample::default()).unwrap();
    assert_eq!(doc.get("note"), Some(&Bson::Null));
}

#[test]
fn conventions_only_apply_to_auto_mapped_classes() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    register(&registry, "camel", |p| {
        p.add(CamelCaseElementNameConvention);
    });
    registry
        .register_class_map::<Sample>(|cm| {
            cm.map_member("display_name");
        })
        .unwrap();
    assert_eq!(
        registry.to_document(&sample()).unwrap(),
        doc! { "display_name": "s" }
    );
}

#[test]
fn pack_composition() {
    let _guard = LOCK.run_concurrently();
    let mut pack = ConventionPack::new();
    assert!(pack.is_empty());
    pack.append(&ConventionPack::defaults())
        .add(CamelCaseElementNameConvention);
    assert_eq!(pack.len(), 6);
    assert_eq!(
        format!("{pack:?}"),
        r#"["MemberFinder", "MemberNameElementName", "IdMember", "ExtraElementsMember", "IdGenerator", "CamelCaseElementName"]"#
    );
}
