use arnold_to_redshift_plugin::{arnold_to_redshift, temperature_to_color, ArnoldToRedshiftPlugin};
use shadeport::graph::clean_up;
use shadeport::host::{HostAdapter, NodeSchema};
use shadeport::model::{AttributeValue, Color, Plug, Scalar, Vec3};
use shadeport::plugin::{SheetContext, SheetPlugin};
use shadeport::{ConversionManager, MemoryScene};

fn scene_with_redshift_types() -> MemoryScene {
    let mut scene = MemoryScene::new();
    for schema in ArnoldToRedshiftPlugin.node_schemas() {
        scene.register_type(schema);
    }
    scene.register_type(NodeSchema::new("shadingEngine").attr("surfaceShader", Color::new(0.0, 0.0, 0.0)));
    scene
}

#[test]
fn test_ai_standard_becomes_redshift_material() {
    let mut scene = scene_with_redshift_types();
    scene.register_type(
        NodeSchema::new("aiStandard")
            .attr("color", Color::new(0.2, 0.3, 0.4))
            .attr("Kd", 0.7)
            .attr("specularAnisotropy", 0.75)
            .attr("Ksn", 0.0)
            .attr("IOR", 0.4)
            .attr("sssRadius", Vec3::new(1.0, 2.0, 3.0))
            .attr("outColor", Color::new(0.0, 0.0, 0.0)),
    );
    scene.register_type(NodeSchema::new("aiImage").attr("filename", "/tex/wood.png").attr("outColor", Color::new(0.0, 0.0, 0.0)));

    let material = scene.add_node("aiStandard", "aiStandard1");
    let texture = scene.add_node("aiImage", "woodTex");
    let engine = scene.add_node("shadingEngine", "aiStandard1SG");
    scene.add_root(engine);
    scene
        .connect(&Plug::with_channel(texture, "outColor"), material, "color")
        .unwrap();
    scene
        .connect(&Plug::with_channel(material, "outColor"), engine, "surfaceShader")
        .unwrap();

    let sheet = arnold_to_redshift(&SheetContext::default());
    let report = ConversionManager::new(&sheet).auto_convert(&mut scene);
    assert_eq!(report.converted(), 1);
    let cleanup = clean_up(&mut scene, &report.pairs());
    assert!(cleanup.is_clean());

    let new_material = scene.find_by_name("RedshiftMaterial1").unwrap();
    assert_eq!(scene.node_type(new_material).unwrap(), "RedshiftMaterial");
    assert_eq!(
        scene.get_attr(new_material, "diffuse_weight").unwrap(),
        AttributeValue::from(0.7)
    );
    assert_eq!(
        scene.get_attr(new_material, "refl_aniso").unwrap(),
        AttributeValue::from(0.5)
    );
    assert_eq!(
        scene.get_attr(new_material, "refl_reflectivity").unwrap(),
        AttributeValue::from(Color::new(0.001, 0.001, 0.001))
    );
    assert_eq!(
        scene.get_attr(new_material, "refl_edge_tint").unwrap(),
        AttributeValue::from(Color::new(1.0, 1.0, 1.0))
    );
    assert_eq!(scene.get_attr(new_material, "refr_ior").unwrap(), AttributeValue::from(1.0));
    assert_eq!(scene.get_attr(new_material, "ms_radius0").unwrap(), AttributeValue::from(2.0));

    // The texture node stays and drives both colour slots of the new material.
    let texture_out = Plug::with_channel(texture, "outColor");
    assert_eq!(scene.node_type(texture).unwrap(), "aiImage");
    assert_eq!(
        scene.get_attr(texture, "filename").unwrap(),
        AttributeValue::from("/tex/wood.png")
    );
    assert_eq!(
        scene.get_connections(new_material, "diffuse_color").unwrap(),
        vec![texture_out.clone()]
    );
    assert_eq!(
        scene.get_connections(new_material, "transl_color").unwrap(),
        vec![texture_out]
    );

    assert_eq!(
        scene.get_connections(engine, "surfaceShader").unwrap(),
        vec![Plug::with_channel(new_material, "outColor")]
    );
}

#[test]
fn test_lights_get_redshift_values_in_place() {
    let mut scene = scene_with_redshift_types();
    scene.register_type(
        NodeSchema::new("pointLight")
            .attr("aiExposure", 3.0)
            .attr("aiSamples", 2)
            .attr("aiDecayType", Scalar::Enum(1))
            .attr("aiColorTemperature", 2000.0)
            .attr("aiUseColorTemperature", true)
            .attr("aiRadius", 0.25)
            .attr("color", Color::new(1.0, 1.0, 1.0))
            .attr("intensity", 1.0)
            .attr("shadowRays", 0)
            .attr("decayRate", Scalar::Enum(0))
            .attr("lightRadius", 0.0),
    );
    let light = scene.add_node("pointLight", "keyLight");

    let sheet = arnold_to_redshift(&SheetContext::default());
    let report = ConversionManager::new(&sheet).auto_convert(&mut scene);
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(report.pairs(), vec![(light, light)]);

    assert_eq!(scene.get_attr(light, "intensity").unwrap(), AttributeValue::from(8.0));
    assert_eq!(scene.get_attr(light, "shadowRays").unwrap(), AttributeValue::from(1));
    assert_eq!(
        scene.get_attr(light, "decayRate").unwrap(),
        AttributeValue::Scalar(Scalar::Enum(2))
    );
    assert_eq!(scene.get_attr(light, "lightRadius").unwrap(), AttributeValue::from(0.25));
    assert_eq!(
        scene.get_attr(light, "color").unwrap(),
        AttributeValue::from(temperature_to_color(2000.0))
    );
}

#[test]
fn test_light_keeps_colour_without_temperature() {
    let mut scene = scene_with_redshift_types();
    scene.register_type(
        NodeSchema::new("directionalLight")
            .attr("aiExposure", 0.0)
            .attr("aiSamples", 1)
            .attr("aiColorTemperature", 2000.0)
            .attr("aiUseColorTemperature", false)
            .attr("aiAngle", 1.5)
            .attr("color", Color::new(0.1, 0.2, 0.3))
            .attr("intensity", 5.0)
            .attr("shadowRays", 0)
            .attr("lightAngle", 0.0),
    );
    let sun = scene.add_node("directionalLight", "sun");

    let sheet = arnold_to_redshift(&SheetContext::default());
    ConversionManager::new(&sheet).auto_convert(&mut scene);

    assert_eq!(scene.get_attr(sun, "intensity").unwrap(), AttributeValue::from(1.0));
    assert_eq!(scene.get_attr(sun, "lightAngle").unwrap(), AttributeValue::from(1.5));
    assert_eq!(
        scene.get_attr(sun, "color").unwrap(),
        AttributeValue::from(Color::new(0.1, 0.2, 0.3))
    );
}

#[test]
fn test_mesh_subdivision_settings() {
    let mut scene = scene_with_redshift_types();
    scene.register_type(
        NodeSchema::new("mesh")
            .attr("aiSubdivType", Scalar::Enum(2))
            .attr("aiSubdivAdaptiveSpace", Scalar::Enum(1))
            .attr("aiSubdivIterations", 3)
            .attr("aiDispHeight", 0.2)
            .attr("aiDispAutobump", true)
            .attr("rsEnableSubdivision", false)
            .attr("rsSubdivisionRule", Scalar::Enum(1))
            .attr("rsDoSmoothSubdivision", true)
            .attr("rsScreenSpaceAdaptive", true)
            .attr("rsMaxTessellationSubdivs", 6)
            .attr("rsDisplacementScale", 1.0)
            .attr("rsAutoBumpMap", false),
    );
    let mesh = scene.add_node("mesh", "bodyShape");

    let sheet = arnold_to_redshift(&SheetContext::default());
    let report = ConversionManager::new(&sheet).auto_convert(&mut scene);
    assert!(report.is_clean(), "{:?}", report);

    assert_eq!(scene.get_attr(mesh, "rsEnableSubdivision").unwrap(), AttributeValue::from(true));
    assert_eq!(
        scene.get_attr(mesh, "rsSubdivisionRule").unwrap(),
        AttributeValue::Scalar(Scalar::Enum(0))
    );
    assert_eq!(scene.get_attr(mesh, "rsDoSmoothSubdivision").unwrap(), AttributeValue::from(false));
    assert_eq!(scene.get_attr(mesh, "rsScreenSpaceAdaptive").unwrap(), AttributeValue::from(false));
    assert_eq!(scene.get_attr(mesh, "rsMaxTessellationSubdivs").unwrap(), AttributeValue::from(3));
    assert_eq!(scene.get_attr(mesh, "rsDisplacementScale").unwrap(), AttributeValue::from(0.2));
    assert_eq!(scene.get_attr(mesh, "rsAutoBumpMap").unwrap(), AttributeValue::from(true));
}

#[test]
fn test_plugin_metadata() {
    let plugin = ArnoldToRedshiftPlugin;
    assert_eq!(shadeport::plugin::Plugin::id(&plugin), "arnold_to_redshift");
    assert_eq!(plugin.description(), "arnold to redshift");
    let sheet = plugin.spec_sheet(&SheetContext::default()).unwrap();
    assert!(sheet.get("aiSkin").is_some());
}
