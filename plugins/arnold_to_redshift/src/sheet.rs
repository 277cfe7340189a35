use log::debug;
use shadeport::assets::texture::transcode_attribute;
use shadeport::convert::Converter;
use shadeport::error::{ConvertError, ShadeportError};
use shadeport::host::{HostAdapter, NodeView};
use shadeport::model::{AttributeValue, Color, NodeRef, Vec3};
use shadeport::plugin::SheetContext;
use shadeport::{ConversionRule, SpecSheet};

/// Builds the table. Texture nodes are left as they are and only get
/// transcode jobs, so they appear only when the context has a transcoder.
pub fn arnold_to_redshift(ctx: &SheetContext) -> SpecSheet {
    let mut sheet = SpecSheet::new();

    match &ctx.transcoder {
        Some(transcoder) => {
            sheet.insert(
                "file",
                ConversionRule::passthrough()
                    .asset_job(transcode_attribute(transcoder.clone(), "fileTextureName")),
            );
            sheet.insert(
                "aiImage",
                ConversionRule::passthrough()
                    .asset_job(transcode_attribute(transcoder.clone(), "filename")),
            );
        }
        None => debug!("arnold_to_redshift: no texture transcoder, skipping texture jobs"),
    }

    sheet.insert("aiStandard", ai_standard());
    sheet.insert("aiStandardSurface", ai_standard_surface());
    sheet.insert("aiSkin", ai_skin());
    sheet.insert("aiAmbientOcclusion", ai_ambient_occlusion());
    sheet.insert("aiNormalMap", ai_normal_map());
    sheet.insert("aiColorCorrect", ai_color_correct());
    sheet.insert("aiRoundCorners", ai_round_corners());
    sheet.insert("aiSkyDomeLight", ai_sky_dome_light());
    sheet.insert("areaLight", light(true));
    sheet.insert("pointLight", light(true).rename("aiRadius", "lightRadius"));
    sheet.insert("directionalLight", light(false).rename("aiAngle", "lightAngle"));
    sheet.insert("mesh", mesh());
    sheet
}

fn ai_standard() -> ConversionRule {
    ConversionRule::to("RedshiftMaterial")
        .secondary("shader")
        .fan_out("color", ["diffuse_color", "transl_color"])
        .rename("Kd", "diffuse_weight")
        .rename("diffuseRoughness", "diffuse_roughness")
        .rename("Kb", "transl_weight")
        .rename("directDiffuse", "diffuse_direct")
        .rename("indirectDiffuse", "diffuse_indirect")
        .rename("KsColor", "refl_color")
        .rename("Ks", "refl_weight")
        .rename("specularRoughness", "refl_roughness")
        .computed(
            "specularAnisotropy",
            "refl_aniso",
            Converter::unary(|v| Ok(((v.try_as::<f64>()? - 0.5) * 2.0).into())),
        )
        .rename("specularRotation", "refl_aniso_rotation")
        .rename("specularDistribution", "refl_brdf")
        // "Color + Edge Tint" unless the source was already on mode 1.
        .computed(
            "specularFresnel",
            "refl_fresnel_mode",
            Converter::unary(|v| {
                let mode: i64 = if v.try_as::<i64>()? == 1 { 1 } else { 3 };
                Ok(mode.into())
            }),
        )
        // A zero reflectivity kills reflections outright.
        .computed(
            "Ksn",
            "refl_reflectivity",
            Converter::unary(|v| {
                let ksn = v.try_as::<f64>()?;
                let r = if ksn > 0.0 { ksn } else { 0.001 };
                Ok(Color::new(r, r, r).into())
            }),
        )
        .computed("Ksn", "refl_edge_tint", Converter::constant(Color::new(1.0, 1.0, 1.0)))
        .rename("directSpecular", "refl_direct")
        .rename("indirectSpecular", "refl_indirect")
        .rename("KtColor", "refr_color")
        .rename("Kt", "refr_weight")
        .computed(
            "IOR",
            "refr_ior",
            Converter::unary(|v| Ok(v.try_as::<f64>()?.max(1.0).into())),
        )
        .rename("FresnelUseIOR", "refr_use_base_IOR")
        .rename("dispersionAbbe", "refr_abbe")
        .rename("refractionRoughness", "refr_roughness")
        .rename("transmittance", "refr_transmittance")
        .rename("opacity", "opacity_color")
        .rename("normalCamera", "bump_input")
        .rename("KsssColor", "ms_color0")
        .rename("Ksss", "ms_amount")
        .computed("sssRadius", "ms_radius0", mean_of_components())
        .rename("emissionColor", "emission_color")
        .rename("emission", "emission_weight")
}

fn ai_standard_surface() -> ConversionRule {
    ConversionRule::to("RedshiftMaterial")
        .secondary("shader")
        .fan_out("baseColor", ["diffuse_color", "transl_color"])
        .rename("base", "diffuse_weight")
        .rename("diffuseRoughness", "diffuse_roughness")
        .rename("indirectDiffuse", "diffuse_indirect")
        .rename("specular", "refl_weight")
        .rename("specularColor", "refl_color")
        .rename("specularRoughness", "refl_roughness")
        .rename("specularIOR", "refl_ior")
        .rename("specularAnisotropy", "refl_aniso")
        .rename("specularRotation", "refl_aniso_rotation")
        .computed("metalness", "refl_fresnel_mode", Converter::constant(2))
        // GGX
        .computed("metalness", "refl_brdf", Converter::constant(1))
        .rename("indirectSpecular", "refl_indirect")
        .rename("transmission", "refr_weight")
        .rename("transmissionColor", "refr_color")
        .rename("transmissionScatter", "ss_scatter_coeff")
        .rename("transmissionDispersion", "refr_abbe")
        .rename("thinWalled", "refr_thin_walled")
        .rename("normalCamera", "bump_input")
        .rename("subsurface", "ms_amount")
        .rename("subsurfaceColor", "ms_color0")
        .computed("subsurfaceRadius", "ms_radius0", mean_of_components())
        .rename("emissionColor", "emission_color")
        .rename("emission", "emission_weight")
        .after(|host, old, new| forward_input(host, old, "metalness", new, "refl_metalness"))
}

fn ai_skin() -> ConversionRule {
    ConversionRule::to("RedshiftSkin")
        .secondary("shader")
        .rename("sssWeight", "overall_scale")
        .rename("globalSssRadiusMultiplier", "radius_scale")
        .rename("shallowScatterColor", "shallow_color")
        .rename("shallowScatterWeight", "shallow_weight")
        .rename("shallowScatterRadius", "shallow_radius")
        .rename("midScatterColor", "mid_color")
        .rename("midScatterWeight", "mid_weight")
        .rename("midScatterRadius", "mid_radius")
        .rename("deepScatterColor", "deep_color")
        .rename("deepScatterWeight", "deep_weight")
        .rename("deepScatterRadius", "deep_radius")
        .rename("specularColor", "refl_color0")
        .rename("specularWeight", "refl_weight0")
        .rename("specularRoughness", "refl_gloss0")
        .rename("specularIor", "refl_ior0")
        .rename("sheenColor", "refl_color1")
        .rename("sheenWeight", "refl_weight1")
        .rename("sheenRoughness", "refl_gloss1")
        .rename("sheenIor", "refl_ior1")
        .rename("normalCamera", "bump_input")
}

fn ai_ambient_occlusion() -> ConversionRule {
    ConversionRule::to("RedshiftAmbientOcclusion")
        .secondary("utility")
        .rename("white", "bright")
        .rename("black", "dark")
        .rename("spread", "spread")
        .computed(
            "falloff",
            "fallOff",
            Converter::unary(|v| Ok((v.try_as::<f64>()? + 1.0).into())),
        )
        .rename("farClip", "maxDistance")
        .rename("invertNormals", "invert")
}

fn ai_normal_map() -> ConversionRule {
    ConversionRule::to("RedshiftBumpMap")
        .secondary("texture")
        .rename("input", "input")
        .computed("strength", "scale", Converter::unary(|v| Ok(v.clone())))
        // tangent-space normal map
        .computed("strength", "inputType", Converter::constant(1))
}

fn ai_color_correct() -> ConversionRule {
    ConversionRule::to("RedshiftColorCorrection")
        .secondary("utility")
        .rename("input", "input")
        .rename("gamma", "gamma")
        .computed(
            "hueShift",
            "hue",
            Converter::unary(|v| Ok(((v.try_as::<f64>()? * 360.0) % 360.0).into())),
        )
        .rename("saturation", "saturation")
        .computed(
            "contrast",
            "contrast",
            Converter::unary(|v| Ok((v.try_as::<f64>()? * 0.5).into())),
        )
        .computed("exposure", "level", exposure_to_intensity())
}

fn ai_round_corners() -> ConversionRule {
    ConversionRule::to("RedshiftRoundCorners")
        .secondary("texture")
        .rename("samples", "numSamples")
        .rename("radius", "radius")
        .rename("selfOnly", "sameObjectOnly")
}

fn ai_sky_dome_light() -> ConversionRule {
    ConversionRule::to("RedshiftDomeLight")
        .secondary("light")
        .computed("color", "tex0", Converter::binary(|_, old| dome_texture(old)))
}

/// Maya lights are kept and get their Redshift attributes written in place.
fn light(with_decay: bool) -> ConversionRule {
    let rule = ConversionRule::in_place()
        .computed("aiExposure", "intensity", exposure_to_intensity())
        .computed("aiSamples", "shadowRays", Converter::constant(1));
    let rule = if with_decay {
        rule.computed(
            "aiDecayType",
            "decayRate",
            Converter::unary(|v| {
                let rate: i64 = if v.try_as::<i64>()? == 0 { 0 } else { 2 };
                Ok(rate.into())
            }),
        )
    } else {
        rule
    };
    rule.computed(
        "aiColorTemperature",
        "color",
        Converter::binary(|v, old| {
            if old.get_static("aiUseColorTemperature")?.try_as::<bool>()? {
                Ok(temperature_to_color(v.try_as::<f64>()?).into())
            } else {
                Ok(old.get_static("color")?)
            }
        }),
    )
}

fn mesh() -> ConversionRule {
    ConversionRule::in_place()
        .computed(
            "aiSubdivType",
            "rsEnableSubdivision",
            Converter::unary(|v| Ok((v.try_as::<i64>()? > 0).into())),
        )
        .computed("aiSubdivType", "rsSubdivisionRule", Converter::constant(0))
        // linear subdivision turns smoothing off
        .computed(
            "aiSubdivType",
            "rsDoSmoothSubdivision",
            Converter::unary(|v| Ok((v.try_as::<i64>()? != 2).into())),
        )
        .computed(
            "aiSubdivAdaptiveSpace",
            "rsScreenSpaceAdaptive",
            Converter::unary(|v| Ok((v.try_as::<i64>()? == 0).into())),
        )
        .rename("aiSubdivIterations", "rsMaxTessellationSubdivs")
        .rename("aiDispHeight", "rsDisplacementScale")
        .rename("aiDispAutobump", "rsAutoBumpMap")
}

fn exposure_to_intensity() -> Converter {
    Converter::unary(|v| Ok(2f64.powf(v.try_as::<f64>()?).into()))
}

fn mean_of_components() -> Converter {
    Converter::unary(|v| {
        let [x, y, z] = v.try_as::<Vec3>()?.to_array();
        Ok(((x + y + z) / 3.0).into())
    })
}

/// Path of the texture driving the dome's colour.
fn dome_texture(old: &NodeView<'_>) -> Result<AttributeValue, ConvertError> {
    let host = old.host();
    let plugs = host.get_connections(old.node(), "color")?;
    let upstream = plugs
        .first()
        .ok_or_else(|| ConvertError::new("dome colour is not driven by a texture"))?;
    let attr = if host.node_type(upstream.node)? == "file" {
        "fileTextureName"
    } else {
        "filename"
    };
    Ok(host.get_static_attr(upstream.node, attr)?)
}

/// Connects whatever drives `old.attr` into `new.target`, or copies the value.
fn forward_input(
    host: &mut dyn HostAdapter,
    old: NodeRef,
    attr: &str,
    new: NodeRef,
    target: &str,
) -> Result<(), ShadeportError> {
    match host.get_connections(old, attr)?.first() {
        Some(plug) => host.connect(plug, new, target)?,
        None => {
            let value = host.get_static_attr(old, attr)?;
            host.set_attr(new, target, value)?;
        }
    }
    Ok(())
}

/// Approximate black-body colour for a temperature in Kelvin, normalised to
/// `0..=1` per channel.
pub fn temperature_to_color(kelvin: f64) -> Color {
    let t = kelvin.clamp(1000.0, 40000.0) / 100.0;
    let r = if t <= 66.0 {
        255.0
    } else {
        329.698727446 * (t - 60.0).powf(-0.1332047592)
    };
    let g = if t <= 66.0 {
        99.4708025861 * t.ln() - 161.1195681661
    } else {
        288.1221695283 * (t - 60.0).powf(-0.0755148492)
    };
    let b = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.5177312231 * (t - 10.0).ln() - 305.0447927307
    };
    Color::new(channel(r), channel(g), channel(b))
}

fn channel(v: f64) -> f64 {
    v.clamp(0.0, 255.0) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_and_daylight_temperatures() {
        let [r, g, b] = temperature_to_color(2000.0).to_array();
        assert_eq!(r, 1.0);
        assert!(b < g && g < r);

        let daylight = temperature_to_color(6500.0).to_array();
        assert!(daylight.iter().all(|c| *c > 0.95));

        let [r, _, b] = temperature_to_color(15000.0).to_array();
        assert!(b > r);
    }

    #[test]
    fn test_texture_rules_follow_transcoder() {
        let plain = arnold_to_redshift(&SheetContext::default());
        assert!(plain.get("file").is_none());
        assert!(plain.get("aiImage").is_none());

        let ctx = SheetContext {
            transcoder: Some(shadeport::assets::TextureTranscoder::new("proc")),
        };
        let sheet = arnold_to_redshift(&ctx);
        assert!(sheet.get("file").unwrap().is_passthrough());
        let image = sheet.get("aiImage").unwrap();
        assert!(image.is_passthrough());
        assert!(image.asset_job.is_some());
    }

    #[test]
    fn test_lights_are_mapped_in_place() {
        let sheet = arnold_to_redshift(&SheetContext::default());
        for light in ["areaLight", "pointLight", "directionalLight", "mesh"] {
            let rule = sheet.get(light).unwrap();
            assert!(rule.is_passthrough() && rule.map_in_place, "{}", light);
        }
        assert!(sheet
            .get("directionalLight")
            .unwrap()
            .attribute_rules
            .get("aiDecayType")
            .is_none());
    }
}
