use std::fs;
use std::path::Path;

use shadeport::host::{HostAdapter, NodeSchema};
use shadeport::model::{AttributeValue, Color, Plug};
use shadeport::plugin::SheetContext;
use shadeport::{run, ConversionManager, MemoryScene, MigrationConfig, PluginManager};

const SHEET: &str = r#"
name = "lite"
description = "Arnold basics"

[[rule]]
source = "aiStandard"
target = "RedshiftMaterial"
secondary = "shader"

[rule.attributes]
Kd = "diffuse_weight"
color = ["diffuse_color", "transl_color"]
specularAnisotropy = { computed = { refl_aniso = { expr = "affine", scale = 2.0, offset = -1.0 } } }

[[rule]]
source = "pointLight"
in_place = true

[rule.attributes]
aiExposure = { computed = { intensity = { expr = "exp2" } } }
"#;

fn arnold_scene() -> MemoryScene {
    let mut scene = MemoryScene::new();
    scene.register_type(
        NodeSchema::new("aiStandard")
            .attr("color", Color::new(0.2, 0.4, 0.6))
            .attr("Kd", 0.8)
            .attr("specularAnisotropy", 0.75)
            .attr("outColor", Color::new(0.0, 0.0, 0.0)),
    );
    scene.register_type(
        NodeSchema::new("RedshiftMaterial")
            .attr("diffuse_color", Color::new(0.5, 0.5, 0.5))
            .attr("transl_color", Color::new(0.0, 0.0, 0.0))
            .attr("diffuse_weight", 1.0)
            .attr("refl_aniso", 0.0)
            .attr("outColor", Color::new(0.0, 0.0, 0.0)),
    );
    scene.register_type(NodeSchema::new("pointLight").attr("aiExposure", 2.0).attr("intensity", 1.0));
    scene.register_type(NodeSchema::new("shadingEngine").attr("surfaceShader", Color::new(0.0, 0.0, 0.0)));

    let material = scene.add_node("aiStandard", "aiStandard1");
    let engine = scene.add_node("shadingEngine", "aiStandard1SG");
    scene.add_node("pointLight", "fill");
    scene
        .connect(&Plug::with_channel(material, "outColor"), engine, "surfaceShader")
        .unwrap();
    scene.add_root(engine);
    scene
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_sheet_document_from_plugin_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lite.toml"), SHEET).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let plugins = PluginManager::new();
    assert_eq!(plugins.load_plugins_from_directory(dir.path()).unwrap(), 1);
    let sheets = plugins.list_sheets();
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].id, "lite");
    assert_eq!(sheets[0].impl_type, "Document");
    assert_eq!(sheets[0].description, "Arnold basics");

    let sheet = plugins.spec_sheet("lite", &SheetContext::default()).unwrap();
    let mut scene = arnold_scene();
    let report = ConversionManager::new(&sheet).auto_convert(&mut scene);
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(report.converted(), 1);

    let new = scene.find_by_name("RedshiftMaterial1").unwrap();
    assert_eq!(scene.get_attr(new, "diffuse_weight").unwrap(), AttributeValue::from(0.8));
    assert_eq!(scene.get_attr(new, "refl_aniso").unwrap(), AttributeValue::from(0.5));
    assert_eq!(
        scene.get_attr(new, "transl_color").unwrap(),
        AttributeValue::from(Color::new(0.2, 0.4, 0.6))
    );
    let light = scene.find_by_name("fill").unwrap();
    assert_eq!(scene.get_attr(light, "intensity").unwrap(), AttributeValue::from(4.0));
}

#[test]
fn test_missing_sheet_id_is_an_error() {
    let plugins = PluginManager::new();
    assert!(plugins.spec_sheet("nope", &SheetContext::default()).is_err());
}

#[test]
fn test_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = MigrationConfig::default();
    config.cleanup.cache_capacity = 32;
    config.plugins.directories.push(dir.path().join("plugins"));
    config.save(&path).unwrap();

    let loaded = MigrationConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(loaded.cleanup_options().cache_capacity, 32);
    assert_eq!(loaded.plugins.directories, config.plugins.directories);

    assert!(MigrationConfig::load_or_default(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_cli_convert_writes_rewired_scene() {
    let dir = tempfile::tempdir().unwrap();
    let scene_path = dir.path().join("scene.json");
    let sheet_path = dir.path().join("lite.toml");
    let config_path = dir.path().join("config.toml");
    let out_path = dir.path().join("out.json");
    fs::write(&scene_path, arnold_scene().save().unwrap()).unwrap();
    fs::write(&sheet_path, SHEET).unwrap();
    fs::write(&config_path, "").unwrap();

    run(vec![
        "shadeport-cli".into(),
        "--config".into(),
        arg(&config_path),
        "convert".into(),
        arg(&scene_path),
        "--sheet".into(),
        arg(&sheet_path),
        "-o".into(),
        arg(&out_path),
        "--strict".into(),
    ])
    .unwrap();

    let scene = MemoryScene::load(&fs::read_to_string(&out_path).unwrap()).unwrap();
    let engine = scene.find_by_name("aiStandard1SG").unwrap();
    let new = scene.find_by_name("RedshiftMaterial1").unwrap();
    assert_eq!(
        scene.get_connections(engine, "surfaceShader").unwrap(),
        vec![Plug::with_channel(new, "outColor")]
    );
}

#[test]
fn test_cli_build_reports_unresolved_references_in_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let scene_path = dir.path().join("scene.json");
    let tree_path = dir.path().join("tree.json");
    let config_path = dir.path().join("config.toml");
    let mut scene = MemoryScene::new();
    scene.register_type(NodeSchema::new("Saver").attr("Input", 0.0));
    fs::write(&scene_path, scene.save().unwrap()).unwrap();
    fs::write(&tree_path, r#"{"type": "Saver", "connected_to": {"ref_id": "ghost"}}"#).unwrap();
    fs::write(&config_path, "").unwrap();

    let args = |strict: bool| {
        let mut args = vec![
            "shadeport-cli".to_string(),
            "-c".into(),
            arg(&config_path),
            "build".into(),
            arg(&scene_path),
            arg(&tree_path),
            "-o".into(),
            arg(&dir.path().join("built.json")),
        ];
        if strict {
            args.push("--strict".into());
        }
        args
    };
    assert!(run(args(false)).is_ok());
    assert!(run(args(true)).is_err());
}
