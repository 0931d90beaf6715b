use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::{
    Bson,
    ClassDescription,
    Mapped,
    Registry,
    bson,
    bson_class,
    doc,
    serializers::{Object, Polymorphic},
    tests::LOCK,
};

#[derive(Clone, Debug, Default, PartialEq)]
struct Animal {
    name: String,
}
bson_class!(Animal { name });

#[derive(Clone, Debug, Default, PartialEq)]
struct Dog {
    animal: Animal,
    breed: String,
}
bson_class!(Dog : Animal = animal { breed });

#[derive(Clone, Debug, Default, PartialEq)]
struct Puppy {
    dog: Dog,
    age_weeks: i32,
}
bson_class!(Puppy : Dog = dog { age_weeks });

#[derive(Clone, Debug, Default, PartialEq)]
struct Cat {
    animal: Animal,
    lives: i32,
}
bson_class!(Cat : Animal = animal { lives });

#[derive(Clone, Debug, Default, PartialEq)]
struct Pen {
    animals: Vec<Polymorphic<Animal>>,
}
bson_class!(Pen { animals });

fn rex() -> Dog {
    Dog {
        animal: Animal { name: "Rex".into() },
        breed: "Beagle".into(),
    }
}

#[test]
fn polymorphic_round_trip() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let pen = Pen {
        animals: vec![
            Polymorphic::new(Animal { name: "Generic".into() }),
            Polymorphic::new(rex()),
            Polymorphic::new(Cat {
                animal: Animal { name: "Tom".into() },
                lives: 9,
            }),
        ],
    };

    let doc = registry.to_document(&pen).unwrap();
    assert_eq!(
        doc,
        doc! {
            "animals": [
                { "name": "Generic" },
                { "_t": "Dog", "name": "Rex", "breed": "Beagle" },
                { "_t": "Cat", "name": "Tom", "lives": 9 },
            ]
        }
    );

    let back: Pen = registry.from_document(doc).unwrap();
    assert_eq!(back, pen);
    assert!(back.animals[0].is::<Animal>());
    assert_eq!(back.animals[1].downcast_ref::<Dog>(), Some(&rex()));
    assert_eq!(back.animals[2].base(&registry).unwrap().name, "Tom");
}

#[test]
fn polymorphic_base_projection() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let puppy = Puppy {
        dog: rex(),
        age_weeks: 8,
    };
    let slot = Polymorphic::<Animal>::new(puppy.clone());
    assert_eq!(slot.base(&registry).unwrap().name, "Rex");
    assert!(!slot.is::<Dog>());

    let slot = Polymorphic::<Dog>::new(puppy);
    assert_eq!(slot.base(&registry).unwrap(), &rex());
}

#[test]
fn unrelated_class_in_polymorphic_slot() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let slot = Polymorphic::<Dog>::new(Cat::default());
    let error = registry.to_bson(&slot).unwrap_err();
    assert!(error.is_format());
    assert!(error.to_string().contains("is not"), "{error}");
    assert!(slot.base(&registry).is_err());
}

#[test]
fn discriminators_must_be_known() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let doc = bson!({ "_t": "Dog", "name": "Rex", "breed": "Beagle" });

    // Dog has not been mapped yet
    let error = registry
        .from_bson::<Polymorphic<Animal>>(doc.clone())
        .unwrap_err();
    assert!(error.to_string().contains("unknown discriminator \"Dog\""), "{error}");

    registry.lookup_class_map::<Dog>().unwrap();
    let slot: Polymorphic<Animal> = registry.from_bson(doc).unwrap();
    assert_eq!(slot.downcast_ref::<Dog>(), Some(&rex()));
}

#[test]
fn known_types_register_discriminators() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Vehicle {
        wheels: i32,
    }
    impl Mapped for Vehicle {
        fn describe(class: &mut ClassDescription<Self>) {
            class.field("wheels", |v| &v.wheels, |v| &mut v.wheels);
            class.known_type::<Bike>();
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Bike {
        vehicle: Vehicle,
        gears: i32,
    }
    bson_class!(Bike : Vehicle = vehicle { gears });

    let registry = Registry::new();
    let slot: Polymorphic<Vehicle> = registry
        .from_bson(bson!({ "_t": "Bike", "wheels": 2, "gears": 21 }))
        .unwrap();
    assert_eq!(
        slot.downcast_ref::<Bike>(),
        Some(&Bike {
            vehicle: Vehicle { wheels: 2 },
            gears: 21,
        })
    );

    // the same through the class map builder
    let registry = Registry::new();
    registry
        .register_class_map::<Animal>(|cm| {
            cm.auto_map();
            cm.add_known_type::<Cat>();
        })
        .unwrap();
    let slot: Polymorphic<Animal> = registry
        .from_bson(bson!({ "_t": "Cat", "name": "Tom", "lives": 3 }))
        .unwrap();
    assert!(slot.is::<Cat>());
}

#[test]
fn root_class_writes_the_discriminator_chain() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Animal>(|cm| {
            cm.auto_map();
            cm.set_is_root_class(true);
        })
        .unwrap();

    let animal_map = registry.lookup_class_map::<Animal>().unwrap();
    assert!(animal_map.is_root_class());
    assert!(animal_map.has_root_class());
    let puppy_map = registry.lookup_class_map::<Puppy>().unwrap();
    assert!(!puppy_map.is_root_class());
    assert!(puppy_map.has_root_class());
    assert_eq!(
        puppy_map.discriminator_value(),
        &bson!(["Animal", "Dog", "Puppy"])
    );

    // written even for the nominal type
    assert_eq!(
        registry.to_document(&Animal { name: "a".into() }).unwrap(),
        doc! { "_t": "Animal", "name": "a" }
    );

    let puppy = Puppy {
        dog: rex(),
        age_weeks: 8,
    };
    let doc = registry
        .to_document(&Polymorphic::<Animal>::new(puppy.clone()))
        .unwrap();
    assert_eq!(
        doc,
        doc! {
            "_t": ["Animal", "Dog", "Puppy"],
            "name": "Rex",
            "breed": "Beagle",
            "age_weeks": 8,
        }
    );
    let back: Polymorphic<Animal> = registry.from_document(doc).unwrap();
    assert_eq!(back.downcast_ref::<Puppy>(), Some(&puppy));
}

#[test]
fn required_discriminator_is_inherited() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Animal>(|cm| {
            cm.auto_map();
            cm.set_discriminator_is_required(true);
        })
        .unwrap();
    assert!(registry.lookup_class_map::<Dog>().unwrap().discriminator_is_required());
    assert_eq!(
        registry.to_document(&rex()).unwrap(),
        doc! { "_t": "Dog", "name": "Rex", "breed": "Beagle" }
    );
    // a matching discriminator is accepted for the exact class
    assert_eq!(
        registry
            .from_document::<Dog>(doc! { "_t": "Dog", "name": "Rex", "breed": "Beagle" })
            .unwrap(),
        rex()
    );
}

#[test]
fn custom_discriminators() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Dog>(|cm| {
            cm.auto_map();
            cm.set_discriminator("dog");
        })
        .unwrap();
    let doc = registry.to_document(&Polymorphic::<Animal>::new(rex())).unwrap();
    assert_eq!(doc.get("_t"), Some(&Bson::String("dog".into())));

    registry.register_discriminator::<Dog>("hound").unwrap();
    let slot: Polymorphic<Animal> = registry
        .from_document(doc! { "_t": "hound", "name": "Rex", "breed": "Beagle" })
        .unwrap();
    assert_eq!(slot.downcast_ref::<Dog>(), Some(&rex()));
}

#[test]
fn ambiguous_discriminators() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Dog>(|cm| {
            cm.auto_map();
            cm.set_discriminator("pet");
        })
        .unwrap();
    registry
        .register_class_map::<Cat>(|cm| {
            cm.auto_map();
            cm.set_discriminator("pet");
        })
        .unwrap();
    registry.lookup_class_map::<Dog>().unwrap();
    registry.lookup_class_map::<Cat>().unwrap();

    let doc = bson!({ "_t": "pet", "name": "x" });
    let error = registry
        .from_bson::<Polymorphic<Animal>>(doc.clone())
        .unwrap_err();
    assert!(error.to_string().contains("ambiguous discriminator"), "{error}");

    // only one candidate derives from Dog
    let slot: Polymorphic<Dog> = registry.from_bson(doc).unwrap();
    assert!(slot.is::<Dog>());
}

#[test]
fn subclass_in_a_plain_slot() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry.lookup_class_map::<Dog>().unwrap();
    let error = registry
        .from_document::<Animal>(doc! { "_t": "Dog", "name": "Rex", "breed": "Beagle" })
        .unwrap_err();
    assert!(error.to_string().contains("Polymorphic<Animal>"), "{error}");
}

#[test]
fn abstract_classes_cannot_be_read() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    registry
        .register_class_map::<Animal>(|cm| {
            cm.auto_map();
            cm.set_is_abstract(true);
        })
        .unwrap();
    registry.lookup_class_map::<Dog>().unwrap();

    let error = registry
        .from_document::<Polymorphic<Animal>>(doc! { "name": "x" })
        .unwrap_err();
    assert!(error.to_string().contains("abstract class Animal"), "{error}");
    assert!(registry.from_document::<Animal>(doc! { "name": "x" }).is_err());

    let slot: Polymorphic<Animal> = registry
        .from_document(doc! { "_t": "Dog", "name": "Rex", "breed": "Beagle" })
        .unwrap();
    assert!(slot.is::<Dog>());
}

#[test]
fn object_slots() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Bag {
        items: Vec<Object>,
    }
    bson_class!(Bag { items });

    let registry = Registry::new();
    let bag = Bag {
        items: vec![
            Object::new(1i32),
            Object::new("two".to_string()),
            Object::null(),
            Object::new(rex()),
            Object::new(doc! { "k": 3 }),
        ],
    };
    let doc = registry.to_document(&bag).unwrap();
    assert_eq!(
        doc,
        doc! {
            "items": [
                1,
                "two",
                null,
                { "_t": "Dog", "name": "Rex", "breed": "Beagle" },
                { "k": 3 },
            ]
        }
    );

    let back: Bag = registry.from_document(doc).unwrap();
    assert_eq!(back, bag);
    assert_eq!(back.items[0].downcast_ref::<i32>(), Some(&1));
    assert!(back.items[2].get().is_none());
    assert_eq!(back.items[3].downcast_ref::<Dog>(), Some(&rex()));
    assert_matches!(back.items[4].downcast_ref::<crate::Document>(), Some(d) if d.len() == 1);
}

#[test]
fn object_slot_with_unknown_discriminator() {
    let _guard = LOCK.run_concurrently();
    let registry = Registry::new();
    let error = registry
        .from_bson::<Object>(bson!({ "_t": "Nobody" }))
        .unwrap_err();
    assert!(error.to_string().contains("unknown discriminator"), "{error}");
}

#[test]
fn known_type_failures_are_replayed() {
    let _guard = LOCK.run_concurrently();

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Part {
        name: String,
    }
    impl Mapped for Part {
        fn describe(class: &mut ClassDescription<Self>) {
            class.field("name", |p| &p.name, |p| &mut p.name);
            class.known_type::<Gear>();
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Gear {
        part: Part,
        label: String,
    }
    bson_class!(Gear : Part = part { label });

    let registry = Registry::new();
    registry
        .register_class_map::<Gear>(|cm| {
            cm.auto_map();
            cm.map_member("label").set_element_name("name");
        })
        .unwrap();

    let read = || registry.from_bson::<Polymorphic<Part>>(bson!({ "_t": "Gear", "name": "g" }));
    let first = read().unwrap_err();
    let second = read().unwrap_err();
    assert!(first.is_mapping_build());
    assert!(second.is_mapping_build());
    assert!(first.to_string().contains("both use the element name name"));
    assert_eq!(first.to_string(), second.to_string());

    // the nominal class itself still builds
    assert!(registry.lookup_class_map::<Part>().is_ok());
}
