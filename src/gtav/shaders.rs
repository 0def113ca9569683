//! Shader presets for the drawable shader group, keyed by `.sps` name.

pub enum ParamKind {
    Texture,
    Vector([f32; 4]),
}

pub struct ShaderParam {
    pub name: &'static str,
    pub kind: ParamKind,
}

pub struct ShaderDef {
    pub file_name: &'static str,
    pub render_bucket: u32,
    pub params: &'static [ShaderParam],
}

const fn texture(name: &'static str) -> ShaderParam {
    ShaderParam {
        name,
        kind: ParamKind::Texture,
    }
}

const fn vector(name: &'static str, value: [f32; 4]) -> ShaderParam {
    ShaderParam {
        name,
        kind: ParamKind::Vector(value),
    }
}

const DEFAULT: ShaderDef = ShaderDef {
    file_name: "default.sps",
    render_bucket: 0,
    params: &[
        texture("DiffuseSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("HardAlphaBlend", [0.0, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

const NORMAL: ShaderDef = ShaderDef {
    file_name: "normal.sps",
    render_bucket: 0,
    params: &[
        texture("DiffuseSampler"),
        texture("BumpSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("HardAlphaBlend", [0.0, 0.0, 0.0, 0.0]),
        vector("bumpiness", [1.0, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

const NORMAL_SPEC: ShaderDef = ShaderDef {
    file_name: "normal_spec.sps",
    render_bucket: 0,
    params: &[
        texture("DiffuseSampler"),
        texture("BumpSampler"),
        texture("SpecSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("HardAlphaBlend", [0.0, 0.0, 0.0, 0.0]),
        vector("bumpiness", [1.0, 0.0, 0.0, 0.0]),
        vector("specularIntensityMult", [0.5, 0.0, 0.0, 0.0]),
        vector("specularFalloffMult", [50.0, 0.0, 0.0, 0.0]),
        vector("specularFresnel", [0.97, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

const SPEC: ShaderDef = ShaderDef {
    file_name: "spec.sps",
    render_bucket: 0,
    params: &[
        texture("DiffuseSampler"),
        texture("SpecSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("HardAlphaBlend", [0.0, 0.0, 0.0, 0.0]),
        vector("specularIntensityMult", [0.5, 0.0, 0.0, 0.0]),
        vector("specularFalloffMult", [50.0, 0.0, 0.0, 0.0]),
        vector("specularFresnel", [0.97, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

const EMISSIVE: ShaderDef = ShaderDef {
    file_name: "emissive.sps",
    render_bucket: 1,
    params: &[
        texture("DiffuseSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("EmissiveMultiplier", [1.0, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

const CUTOUT: ShaderDef = ShaderDef {
    file_name: "cutout.sps",
    render_bucket: 1,
    params: &[
        texture("DiffuseSampler"),
        vector("matMaterialColorScale", [1.0, 0.0, 0.0, 1.0]),
        vector("HardAlphaBlend", [1.0, 0.0, 0.0, 0.0]),
        vector("useTessellation", [0.0, 0.0, 0.0, 0.0]),
    ],
};

/// Looks up a preset by `.sps` name, falling back to the default shader.
pub fn shader_def(name: &str) -> &'static ShaderDef {
    match name {
        "normal.sps" => &NORMAL,
        "normal_spec.sps" => &NORMAL_SPEC,
        "spec.sps" => &SPEC,
        "emissive.sps" => &EMISSIVE,
        "cutout.sps" => &CUTOUT,
        _ => &DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        assert_eq!("default.sps", shader_def("unknown.sps").file_name);
        assert_eq!("normal.sps", shader_def("normal.sps").file_name);
        assert_eq!(1, shader_def("emissive.sps").render_bucket);
    }
}
