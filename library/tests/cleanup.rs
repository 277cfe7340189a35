use shadeport::graph::{clean_up, clean_up_with, outputs, CleanupOptions};
use shadeport::host::{HostAdapter, NodeSchema};
use shadeport::model::{AttributeValue, Color, Plug};
use shadeport::{auto_convert, ConversionRule, MemoryScene, NodeRef, SpecSheet};

struct Fixture {
    scene: MemoryScene,
    old: NodeRef,
    other: NodeRef,
    engine: NodeRef,
    object: NodeRef,
}

fn fixture() -> Fixture {
    let mut scene = MemoryScene::new();
    scene.register_type(NodeSchema::new("OldShader").attr("outColor", Color::new(0.0, 0.0, 0.0)));
    scene.register_type(NodeSchema::new("NewShader").attr("outColor", Color::new(0.0, 0.0, 0.0)));
    scene.register_type(NodeSchema::new("Engine").attr("surfaceShader", Color::new(0.0, 0.0, 0.0)));

    let old = scene.add_node("OldShader", "OldShader1");
    let other = scene.add_node("NewShader", "keep");
    let engine = scene.add_node("Engine", "engine");
    scene
        .connect(&Plug::with_channel(old, "outColor"), engine, "surfaceShader")
        .unwrap();

    let object = scene.add_node("Object", "body");
    scene
        .declare_attr(
            object,
            "materials",
            AttributeValue::Array(vec![Plug::new(other).into(), Plug::new(old).into()]),
        )
        .unwrap();
    scene.add_root(engine);
    scene.add_root(object);

    Fixture {
        scene,
        old,
        other,
        engine,
        object,
    }
}

fn sheet() -> SpecSheet {
    SpecSheet::new().with_rule("OldShader", ConversionRule::to("NewShader"))
}

#[test]
fn test_consumers_are_repointed_including_array_slots() {
    let Fixture {
        mut scene,
        old,
        other,
        engine,
        object,
    } = fixture();
    assert_eq!(outputs(&scene, old).len(), 2);

    let pairs = auto_convert(&mut scene, &sheet());
    let new = pairs[0].1;
    let report = clean_up(&mut scene, &pairs);

    assert!(report.is_clean());
    assert_eq!(report.rewired.len(), 2);
    assert_eq!(
        scene.get_connections(engine, "surfaceShader").unwrap(),
        vec![Plug::with_channel(new, "outColor")]
    );
    assert_eq!(
        scene.get_attr(object, "materials").unwrap(),
        AttributeValue::Array(vec![Plug::new(other).into(), Plug::new(new).into()])
    );
    assert!(outputs(&scene, old).is_empty());
}

#[test]
fn test_second_cleanup_changes_nothing() {
    let Fixture { mut scene, .. } = fixture();
    let pairs = auto_convert(&mut scene, &sheet());

    let first = clean_up(&mut scene, &pairs);
    assert_eq!(first.rewired.len(), 2);
    let after_first = scene.clone();

    let second = clean_up(&mut scene, &pairs);
    assert!(second.rewired.is_empty());
    assert!(second.is_clean());
    assert_eq!(scene, after_first);
}

#[test]
fn test_memoised_cleanup_matches_uncached() {
    let Fixture { mut scene, .. } = fixture();
    let pairs = auto_convert(&mut scene, &sheet());
    let mut uncached = scene.clone();

    let options = CleanupOptions {
        cache_capacity: 16,
        ..CleanupOptions::default()
    };
    let cached_report = clean_up_with(&mut scene, &pairs, &options);
    let plain_report = clean_up(&mut uncached, &pairs);

    assert_eq!(cached_report.rewired.len(), plain_report.rewired.len());
    assert_eq!(scene, uncached);
}

#[test]
fn test_rewire_to_missing_node_is_reported() {
    let Fixture {
        mut scene,
        old,
        engine,
        ..
    } = fixture();
    let odd = scene.add_node("Object", "odd");
    let report = clean_up(&mut scene, &[(old, odd)]);

    assert_eq!(report.rewired.len(), 2);
    assert!(report.is_clean());
    assert_eq!(
        scene.get_connections(engine, "surfaceShader").unwrap(),
        vec![Plug::with_channel(odd, "outColor")]
    );

    let missing = NodeRef::new();
    let report = clean_up(&mut scene, &[(odd, missing)]);
    assert!(report.rewired.is_empty());
    assert_eq!(report.failures.len(), 2);
}
