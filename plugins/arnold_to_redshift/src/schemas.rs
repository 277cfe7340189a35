use shadeport::host::NodeSchema;
use shadeport::model::{Color, Scalar, Vec3};

fn rgb(v: f64) -> Color {
    Color::new(v, v, v)
}

fn enumeration(index: i64) -> Scalar {
    Scalar::Enum(index)
}

/// Redshift node types the sheet creates, with Maya's default values.
pub fn redshift_schemas() -> Vec<NodeSchema> {
    vec![
        NodeSchema::new("RedshiftMaterial")
            .attr("diffuse_color", rgb(0.5))
            .attr("diffuse_weight", 1.0)
            .attr("diffuse_roughness", 0.0)
            .attr("diffuse_direct", 1.0)
            .attr("diffuse_indirect", 1.0)
            .attr("transl_color", rgb(0.0))
            .attr("transl_weight", 0.0)
            .attr("refl_color", rgb(1.0))
            .attr("refl_weight", 1.0)
            .attr("refl_roughness", 0.0)
            .attr("refl_aniso", 0.0)
            .attr("refl_aniso_rotation", 0.0)
            .attr("refl_brdf", enumeration(0))
            .attr("refl_fresnel_mode", enumeration(3))
            .attr("refl_reflectivity", rgb(0.04))
            .attr("refl_edge_tint", rgb(0.0))
            .attr("refl_metalness", 0.0)
            .attr("refl_ior", 1.5)
            .attr("refl_direct", 1.0)
            .attr("refl_indirect", 1.0)
            .attr("refr_color", rgb(1.0))
            .attr("refr_weight", 0.0)
            .attr("refr_ior", 1.5)
            .attr("refr_use_base_IOR", true)
            .attr("refr_abbe", 0.0)
            .attr("refr_roughness", 0.0)
            .attr("refr_transmittance", rgb(1.0))
            .attr("refr_thin_walled", false)
            .attr("ss_scatter_coeff", rgb(1.0))
            .attr("opacity_color", rgb(1.0))
            .attr("bump_input", Vec3::splat(0.0))
            .attr("ms_amount", 0.0)
            .attr("ms_color0", rgb(1.0))
            .attr("ms_radius0", 1.0)
            .attr("emission_color", rgb(0.0))
            .attr("emission_weight", 0.0)
            .attr("outColor", rgb(0.0)),
        NodeSchema::new("RedshiftSkin")
            .attr("overall_scale", 1.0)
            .attr("radius_scale", 1.0)
            .attr("shallow_color", Color::new(1.0, 0.9, 0.7))
            .attr("shallow_weight", 0.5)
            .attr("shallow_radius", 0.15)
            .attr("mid_color", Color::new(0.9, 0.4, 0.3))
            .attr("mid_weight", 0.25)
            .attr("mid_radius", 0.25)
            .attr("deep_color", Color::new(0.7, 0.1, 0.1))
            .attr("deep_weight", 1.0)
            .attr("deep_radius", 0.6)
            .attr("refl_color0", rgb(1.0))
            .attr("refl_weight0", 0.7)
            .attr("refl_gloss0", 0.6)
            .attr("refl_ior0", 1.4)
            .attr("refl_color1", rgb(1.0))
            .attr("refl_weight1", 0.0)
            .attr("refl_gloss1", 0.6)
            .attr("refl_ior1", 1.4)
            .attr("bump_input", Vec3::splat(0.0))
            .attr("outColor", rgb(0.0)),
        NodeSchema::new("RedshiftAmbientOcclusion")
            .attr("bright", rgb(1.0))
            .attr("dark", rgb(0.0))
            .attr("spread", 0.8)
            .attr("fallOff", 1.0)
            .attr("maxDistance", 0.0)
            .attr("invert", enumeration(0))
            .attr("outColor", rgb(0.0)),
        NodeSchema::new("RedshiftBumpMap")
            .attr("input", rgb(0.0))
            .attr("scale", 1.0)
            .attr("inputType", enumeration(0))
            .attr("out", Vec3::splat(0.0)),
        NodeSchema::new("RedshiftColorCorrection")
            .attr("input", rgb(0.0))
            .attr("gamma", 1.0)
            .attr("hue", 0.0)
            .attr("saturation", 1.0)
            .attr("contrast", 0.0)
            .attr("level", 1.0)
            .attr("outColor", rgb(0.0)),
        NodeSchema::new("RedshiftRoundCorners")
            .attr("numSamples", 4)
            .attr("radius", 0.1)
            .attr("sameObjectOnly", false)
            .attr("out", Vec3::splat(0.0)),
        NodeSchema::new("RedshiftDomeLight").attr("tex0", ""),
    ]
}
