//! Text generators for the CodeWalker-style GTA V asset XML files. The
//! external converter consumes a fixed layout with 8-decimal floats, so the
//! output is formatted by hand rather than through an XML writer.

pub mod archetype;
pub mod bounds;
pub mod drawable;
pub mod shaders;
pub mod texture_dict;

pub use bounds::CollisionType;
pub use texture_dict::TextureEntry;

use glam::Vec3;

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn vec3_attr(v: Vec3) -> String {
    format!("x=\"{:.8}\" y=\"{:.8}\" z=\"{:.8}\"", v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!("a&amp;b &lt;c&gt; &quot;d&quot;", esc("a&b <c> \"d\""));
    }

    #[test]
    fn formats_vectors_with_fixed_precision() {
        assert_eq!(
            "x=\"1.00000000\" y=\"-0.50000000\" z=\"0.00000000\"",
            vec3_attr(Vec3::new(1.0, -0.5, 0.0))
        );
    }
}
