use std::{
    sync::{
        Arc,
        Barrier,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::{
    Bson,
    ClassDescription,
    Mapped,
    Registry,
    bson_class,
    class_map::IdGenerator,
    conventions::{ConventionPack, DelegateConvention, IgnoreExtraElementsConvention},
    doc,
    error::{ErrorKind, Result},
    extjson::JsonWriterOptions,
    oid::ObjectId,
    serializers::{ObjectValue, Polymorphic, SerializationOptions, Serializer},
    tests::LOCK,
    uuid::Uuid,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct Order {
    id: ObjectId,
    item: String,
    quantity: i32,
    shipped: bool,
}
bson_class!(Order { id, item, quantity, shipped });

#[test]
fn codec_entry_points() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let order = Order {
        id: ObjectId::parse_str("5f0c1b2a3d4e5f6a7b8c9d0e").unwrap(),
        item: "pen".into(),
        quantity: 2,
        shipped: false,
    };

    let bytes = registry.to_vec(&order).unwrap();
    assert_eq!(registry.from_slice::<Order>(&bytes).unwrap(), order);

    let json = registry.to_json(&order, &JsonWriterOptions::shell()).unwrap();
    assert_eq!(
        json,
        r#"{ "_id" : ObjectId("5f0c1b2a3d4e5f6a7b8c9d0e"), "item" : "pen", "quantity" : 2, "shipped" : false }"#
    );
    assert_eq!(registry.from_json::<Order>(&json).unwrap(), order);

    let strict = registry.to_json(&order, &JsonWriterOptions::strict()).unwrap();
    assert!(strict.starts_with(r#"{ "_id" : { "$oid" : "5f0c1b2a3d4e5f6a7b8c9d0e" }"#), "{strict}");
    assert_eq!(registry.from_json::<Order>(&strict).unwrap(), order);

    assert_eq!(registry.to_bson(&order).unwrap(), Bson::Document(registry.to_document(&order).unwrap()));
    assert_eq!(
        registry
            .from_bson::<Order>(Bson::Document(doc! { "item": "x" }))
            .unwrap()
            .item,
        "x"
    );
}

#[test]
fn scalars_are_not_documents() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let error = registry.to_document(&5i32).unwrap_err();
    assert_matches!(error.kind, ErrorKind::UnsupportedConversion { .. });
    assert!(registry.from_bson::<Order>(Bson::Int32(1)).is_err());
}

#[test]
fn truncated_input() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let bytes = registry.to_vec(&Order::default()).unwrap();
    assert!(registry.from_slice::<Order>(&bytes[..bytes.len() - 3]).is_err());
    assert!(registry.from_slice::<Order>(&[]).is_err());
}

#[test]
fn assign_object_id() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let class_map = registry.lookup_class_map::<Order>().unwrap();
    assert!(class_map.id_member_map().unwrap().id_generator().is_some());

    let mut order = Order::default();
    assert!(registry.assign_id(&mut order).unwrap());
    assert!(!order.id.is_empty());

    let assigned = order.id;
    assert!(!registry.assign_id(&mut order).unwrap());
    assert_eq!(order.id, assigned);
}

#[test]
fn assign_uuid() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Token {
        id: Uuid,
    }
    bson_class!(Token { id });

    let registry = Registry::new();
    let mut token = Token::default();
    assert!(registry.assign_id(&mut token).unwrap());
    assert!(!token.id.is_nil());
}

#[test]
fn classes_without_an_id_are_left_alone() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Note {
        text: String,
    }
    bson_class!(Note { text });

    let registry = Registry::new();
    let mut note = Note::default();
    assert!(!registry.assign_id(&mut note).unwrap());
}

#[derive(Debug, Default)]
struct Sequence(AtomicI64);

impl IdGenerator for Sequence {
    fn is_empty(&self, id: &dyn ObjectValue) -> bool {
        id.as_any().downcast_ref::<i64>().is_none_or(|id| *id == 0)
    }

    fn generate(&self) -> Result<Box<dyn ObjectValue>> {
        Ok(Box::new(self.0.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

#[test]
fn custom_id_generator() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Invoice {
        id: i64,
    }
    bson_class!(Invoice { id });

    let registry = Registry::new();
    let mut invoice = Invoice::default();
    // no generator for i64 yet
    assert!(!registry.assign_id(&mut invoice).unwrap());

    let registry = Registry::new();
    registry.register_id_generator::<i64>(Sequence::default());
    let mut first = Invoice::default();
    let mut second = Invoice::default();
    assert!(registry.assign_id(&mut first).unwrap());
    assert!(registry.assign_id(&mut second).unwrap());
    assert_eq!((first.id, second.id), (1, 2));
}

#[test]
fn member_id_generator_overrides_the_registry() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Ticket {
        number: i64,
    }
    bson_class!(Ticket { number });

    let registry = Registry::new();
    registry
        .register_class_map::<Ticket>(|cm| {
            cm.auto_map();
            cm.map_id_member("number")
                .set_id_generator(Sequence(AtomicI64::new(99)));
        })
        .unwrap();
    let mut ticket = Ticket::default();
    assert!(registry.assign_id(&mut ticket).unwrap());
    assert_eq!(ticket.number, 100);
    assert_eq!(registry.to_document(&ticket).unwrap(), doc! { "_id": 100i64 });
}

struct YesNo;

impl Serializer<bool> for YesNo {
    fn serialize(&self, _: &Registry, value: &bool, _: &SerializationOptions) -> Result<Bson> {
        Ok(Bson::String(if *value { "yes" } else { "no" }.into()))
    }

    fn deserialize(&self, _: &Registry, bson: Bson, _: &SerializationOptions) -> Result<bool> {
        match bson {
            Bson::String(s) => Ok(s == "yes"),
            other => Err(crate::error::Error::format(format!("expected yes or no, found {other}"))),
        }
    }
}

#[test]
fn registered_serializers() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry.register_serializer::<bool>(YesNo).unwrap();
    let error = registry.register_serializer::<bool>(YesNo).unwrap_err();
    assert_matches!(error.kind, ErrorKind::UnsupportedConversion { .. });

    assert_eq!(registry.to_bson(&true).unwrap(), Bson::String("yes".into()));
    let order = Order {
        shipped: true,
        ..Default::default()
    };
    let doc = registry.to_document(&order).unwrap();
    assert_eq!(doc.get("shipped"), Some(&Bson::String("yes".into())));
    assert_eq!(registry.from_document::<Order>(doc).unwrap(), order);

    // the default serializer is fixed once used
    let registry = Registry::new();
    registry.to_bson(&1i32).unwrap();
    assert!(registry.register_serializer::<bool>(YesNo).is_ok());
    assert!(registry.register_serializer::<i32>(crate::serializers::NumericSerializer::new()).is_err());
}

#[test]
fn member_serializer() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Order>(|cm| {
            cm.auto_map();
            cm.map_member("shipped").set_serializer(YesNo);
        })
        .unwrap();
    let doc = registry.to_document(&Order::default()).unwrap();
    assert_eq!(doc.get("shipped"), Some(&Bson::String("no".into())));
    // other bool values keep the default serializer
    assert_eq!(registry.to_bson(&false).unwrap(), Bson::Boolean(false));
}

#[test]
fn serializer_of_the_wrong_type() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Order>(|cm| {
            cm.auto_map();
            cm.map_member("quantity").set_serializer(YesNo);
        })
        .unwrap();
    assert!(registry.lookup_class_map::<Order>().unwrap_err().is_mapping_build());
}

#[test]
fn global_registry_is_shared() {
    let _guard = LOCK.run_exclusively();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Setting {
        key: String,
    }
    bson_class!(Setting { key });

    assert!(std::ptr::eq(Registry::global(), Registry::global()));
    Registry::global()
        .register_class_map::<Setting>(|cm| {
            cm.map_member("key").set_element_name("k");
        })
        .unwrap();
    assert_eq!(
        Registry::global()
            .to_document(&Setting { key: "v".into() })
            .unwrap(),
        doc! { "k": "v" }
    );
    assert_eq!(
        Registry::global().to_bson(&"s".to_string()).unwrap(),
        Bson::String("s".into())
    );
}

#[test]
fn parallel_lookups_share_one_class_map() {
    let _guard = LOCK.run_concurrently();

    let registry = Registry::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let mut pack = ConventionPack::new();
    pack.add(DelegateConvention::new("count", {
        let builds = builds.clone();
        move |_| {
            builds.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
        }
    }));
    registry.conventions().register("count", pack, |_| true);

    let class_maps: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| registry.lookup_class_map::<Order>().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    for class_map in &class_maps[1..] {
        assert!(Arc::ptr_eq(&class_maps[0], class_map));
    }
}

#[test]
fn registering_conventions_during_a_build() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Early {
        name: String,
    }
    bson_class!(Early { name });

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Late {
        name: String,
    }
    bson_class!(Late { name });

    let registry = Registry::new();
    let building = Arc::new(Barrier::new(2));
    let mut pack = ConventionPack::new();
    pack.add(DelegateConvention::new("pause", {
        let building = building.clone();
        move |class| {
            if class.type_info().short_name() == "Early" {
                building.wait();
                thread::sleep(Duration::from_millis(50));
            }
        }
    }));
    registry.conventions().register("pause", pack, |_| true);

    thread::scope(|s| {
        let build = s.spawn(|| registry.lookup_class_map::<Early>());
        building.wait();
        let mut late = ConventionPack::new();
        late.add(IgnoreExtraElementsConvention(true));
        registry.conventions().register("late", late, |_| true);

        // the build in flight keeps the packs it started with
        let early = build.join().unwrap().unwrap();
        assert!(!early.ignore_extra_elements());
    });

    assert!(registry.lookup_class_map::<Late>().unwrap().ignore_extra_elements());
    assert!(!registry.lookup_class_map::<Early>().unwrap().ignore_extra_elements());
}

#[test]
fn concurrent_polymorphic_reads() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Account {
        owner: String,
    }
    impl Mapped for Account {
        fn describe(class: &mut ClassDescription<Self>) {
            class.field("owner", |a| &a.owner, |a| &mut a.owner);
            class.known_type::<Savings>();
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Savings {
        account: Account,
        rate: f64,
    }
    bson_class!(Savings : Account = account { rate });

    let registry = Registry::new();
    let building = Arc::new(Barrier::new(2));
    let mut pack = ConventionPack::new();
    pack.add(DelegateConvention::new("pause", {
        let building = building.clone();
        move |class| {
            if class.type_info().short_name() == "Savings" {
                building.wait();
                thread::sleep(Duration::from_millis(100));
            }
        }
    }));
    registry.conventions().register("pause", pack, |_| true);

    let read = || {
        registry.from_document::<Polymorphic<Account>>(doc! {
            "_t": "Savings",
            "owner": "ann",
            "rate": 1.5,
        })
    };
    let (first, second) = thread::scope(|s| {
        let first = s.spawn(read);
        // the second read starts while the known type is still being built
        building.wait();
        let second = s.spawn(read);
        (first.join().unwrap(), second.join().unwrap())
    });
    for slot in [first.unwrap(), second.unwrap()] {
        assert_eq!(
            slot.downcast_ref::<Savings>(),
            Some(&Savings {
                account: Account { owner: "ann".into() },
                rate: 1.5,
            })
        );
    }
}
