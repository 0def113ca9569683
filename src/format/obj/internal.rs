use indexmap::IndexMap;

/// Represents the statements of a Wavefront OBJ file relevant to prop
/// conversion. Faces are triangulated at parse time (n-gons become a fan)
/// and keep the material group active when they were declared.
#[derive(Debug, Default, PartialEq)]
pub struct Obj {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub faces: Vec<Face>,
    /// Material library referenced by `mtllib`, if any.
    pub mtl_lib: Option<String>,
    pub groups: Vec<String>,
}

/// One triangle and the group it was declared under.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub group: String,
    pub verts: [FaceVertex; 3],
}

/// Indices into the position/texcoord/normal statement lists, already
/// converted from the format's one-based convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub position: usize,
    pub tex_coord: Option<usize>,
    pub normal: Option<usize>,
}

impl Obj {
    pub fn parse(text: &str) -> Self {
        let mut obj = Self::default();
        let mut current_group = String::from("default");
        obj.groups.push(current_group.clone());

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let command = match parts.next() {
                Some(command) => command,
                None => continue,
            };
            let rest: Vec<&str> = parts.collect();

            match command {
                "v" => obj.positions.push(parse_vec3(&rest)),
                "vn" => obj.normals.push(parse_vec3(&rest)),
                "vt" => obj.tex_coords.push(parse_vec2(&rest)),
                "f" => {
                    let verts: Vec<FaceVertex> =
                        rest.iter().filter_map(|part| parse_face_vertex(part)).collect();
                    // Triangulate n-gons with a fan.
                    for i in 1..verts.len().saturating_sub(1) {
                        obj.faces.push(Face {
                            group: current_group.clone(),
                            verts: [verts[0], verts[i], verts[i + 1]],
                        });
                    }
                }
                "usemtl" | "g" | "o" => {
                    let name = rest.join(" ");
                    current_group = if name.is_empty() {
                        String::from("default")
                    } else {
                        name
                    };
                    if !obj.groups.contains(&current_group) {
                        obj.groups.push(current_group.clone());
                    }
                }
                "mtllib" => obj.mtl_lib = Some(rest.join(" ")),
                _ => {}
            }
        }
        obj
    }
}

fn parse_float(parts: &[&str], index: usize) -> f32 {
    parts
        .get(index)
        .and_then(|p| p.parse().ok())
        .unwrap_or(0.0)
}

fn parse_vec3(parts: &[&str]) -> [f32; 3] {
    [
        parse_float(parts, 0),
        parse_float(parts, 1),
        parse_float(parts, 2),
    ]
}

fn parse_vec2(parts: &[&str]) -> [f32; 2] {
    [parse_float(parts, 0), parse_float(parts, 1)]
}

/// Parses `v`, `v/vt`, `v//vn`, or `v/vt/vn` references.
fn parse_face_vertex(part: &str) -> Option<FaceVertex> {
    let mut indices = part.split('/');
    let position = indices.next()?.parse::<usize>().ok()?.checked_sub(1)?;
    let tex_coord = indices
        .next()
        .and_then(|i| i.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));
    let normal = indices
        .next()
        .and_then(|i| i.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));
    Some(FaceVertex {
        position,
        tex_coord,
        normal,
    })
}

/// Represents one material of an MTL material library.
#[derive(Debug, Clone, PartialEq)]
pub struct Mtl {
    pub name: String,
    pub diffuse_color: [f32; 4],
    pub diffuse_map: Option<String>,
    pub normal_map: Option<String>,
    pub specular_map: Option<String>,
}

impl Mtl {
    fn new(name: String) -> Self {
        Self {
            name,
            diffuse_color: [0.8, 0.8, 0.8, 1.0],
            diffuse_map: None,
            normal_map: None,
            specular_map: None,
        }
    }
}

pub fn parse_mtl(text: &str) -> IndexMap<String, Mtl> {
    let mut materials: IndexMap<String, Mtl> = IndexMap::new();
    let mut current: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = match parts.next() {
            Some(command) => command,
            None => continue,
        };
        let rest: Vec<&str> = parts.collect();

        match command {
            "newmtl" => {
                let name = rest.join(" ");
                materials.insert(name.clone(), Mtl::new(name.clone()));
                current = Some(name);
            }
            "Kd" => {
                if let Some(mtl) = current.as_ref().and_then(|n| materials.get_mut(n)) {
                    mtl.diffuse_color = [
                        parse_float(&rest, 0),
                        parse_float(&rest, 1),
                        parse_float(&rest, 2),
                        1.0,
                    ];
                }
            }
            "map_Kd" => {
                if let Some(mtl) = current.as_ref().and_then(|n| materials.get_mut(n)) {
                    mtl.diffuse_map = Some(rest.join(" "));
                }
            }
            "map_Bump" | "bump" => {
                if let Some(mtl) = current.as_ref().and_then(|n| materials.get_mut(n)) {
                    mtl.normal_map = Some(rest.join(" "));
                }
            }
            "map_Ks" => {
                if let Some(mtl) = current.as_ref().and_then(|n| materials.get_mut(n)) {
                    mtl.specular_map = Some(rest.join(" "));
                }
            }
            _ => {}
        }
    }
    materials
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_statements_and_triangulates_quads() {
        let obj = Obj::parse(
            "# comment\n\
             mtllib props.mtl\n\
             v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\n\
             vn 0 0 1\n\
             usemtl crate\n\
             f 1/1/1 2/1/1 3/1/1 4/1/1\n",
        );

        assert_eq!(4, obj.positions.len());
        assert_eq!(Some(String::from("props.mtl")), obj.mtl_lib);
        // The quad becomes a two-triangle fan.
        assert_eq!(2, obj.faces.len());
        assert_eq!("crate", obj.faces[0].group);
        assert_eq!(0, obj.faces[0].verts[0].position);
        assert_eq!(3, obj.faces[1].verts[2].position);
        assert_eq!(vec!["default", "crate"], obj.groups);
    }

    #[test]
    fn face_vertices_without_texcoord_or_normal() {
        let obj = Obj::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(
            FaceVertex {
                position: 0,
                tex_coord: None,
                normal: None,
            },
            obj.faces[0].verts[0]
        );

        let obj = Obj::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1//1 2//1 3//1\n");
        assert_eq!(None, obj.faces[0].verts[0].tex_coord);
        assert_eq!(Some(0), obj.faces[0].verts[0].normal);
    }

    #[test]
    fn parses_material_library() {
        let materials = parse_mtl(
            "newmtl crate\n\
             Kd 0.5 0.25 0.125\n\
             map_Kd crate_diff.png\n\
             map_Bump crate_n.png\n\
             newmtl plain\n",
        );

        let crate_mtl = &materials["crate"];
        assert_eq!([0.5, 0.25, 0.125, 1.0], crate_mtl.diffuse_color);
        assert_eq!(Some(String::from("crate_diff.png")), crate_mtl.diffuse_map);
        assert_eq!(Some(String::from("crate_n.png")), crate_mtl.normal_map);
        assert_eq!(None, crate_mtl.specular_map);
        assert_eq!([0.8, 0.8, 0.8, 1.0], materials["plain"].diffuse_color);
    }
}
