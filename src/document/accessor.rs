use crate::document::property::Ref;

/// Logical element shape of an accessor. The element size is a pure function
/// of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    /// Number of components in one element.
    pub fn size(self) -> usize {
        match self {
            ElementType::Scalar => 1,
            ElementType::Vec2 => 2,
            ElementType::Vec3 => 3,
            ElementType::Vec4 => 4,
            ElementType::Mat2 => 4,
            ElementType::Mat3 => 9,
            ElementType::Mat4 => 16,
        }
    }
}

/// Storage type of a single component, mirroring the GL component codes used
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

/// A typed array of numeric components. The component type of an accessor is
/// derived from the variant and cannot be chosen independently of the data.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarArray {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl ScalarArray {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ScalarArray::I8(_) => ComponentType::I8,
            ScalarArray::U8(_) => ComponentType::U8,
            ScalarArray::I16(_) => ComponentType::I16,
            ScalarArray::U16(_) => ComponentType::U16,
            ScalarArray::U32(_) => ComponentType::U32,
            ScalarArray::F32(_) => ComponentType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScalarArray::I8(v) => v.len(),
            ScalarArray::U8(v) => v.len(),
            ScalarArray::I16(v) => v.len(),
            ScalarArray::U16(v) => v.len(),
            ScalarArray::U32(v) => v.len(),
            ScalarArray::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw component value, without normalization applied.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            ScalarArray::I8(v) => f64::from(v[index]),
            ScalarArray::U8(v) => f64::from(v[index]),
            ScalarArray::I16(v) => f64::from(v[index]),
            ScalarArray::U16(v) => f64::from(v[index]),
            ScalarArray::U32(v) => f64::from(v[index]),
            ScalarArray::F32(v) => f64::from(v[index]),
        }
    }

    /// Raw component store, without normalization applied.
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            ScalarArray::I8(v) => v[index] = value as i8,
            ScalarArray::U8(v) => v[index] = value as u8,
            ScalarArray::I16(v) => v[index] = value as i16,
            ScalarArray::U16(v) => v[index] = value as u16,
            ScalarArray::U32(v) => v[index] = value as u32,
            ScalarArray::F32(v) => v[index] = value as f32,
        }
    }
}

/// Maps a stored integer onto the floating-point range [0, 1] (unsigned) or
/// [-1, 1] (signed). Float components pass through unchanged.
pub fn decode_normalized(value: f64, component_type: ComponentType) -> f64 {
    match component_type {
        ComponentType::F32 | ComponentType::U32 => value,
        ComponentType::U16 => value / 65535.0,
        ComponentType::U8 => value / 255.0,
        ComponentType::I16 => (value / 32767.0).max(-1.0),
        ComponentType::I8 => (value / 127.0).max(-1.0),
    }
}

/// Inverse of [`decode_normalized`]: clamp to the representable range, scale,
/// and round to the nearest stored integer.
pub fn encode_normalized(value: f64, component_type: ComponentType) -> f64 {
    match component_type {
        ComponentType::F32 | ComponentType::U32 => value,
        ComponentType::U16 => (value.clamp(0.0, 1.0) * 65535.0).round(),
        ComponentType::U8 => (value.clamp(0.0, 1.0) * 255.0).round(),
        ComponentType::I16 => (value.clamp(-1.0, 1.0) * 32767.0).round(),
        ComponentType::I8 => (value.clamp(-1.0, 1.0) * 127.0).round(),
    }
}

/// Payload of an accessor property: a typed array plus its logical shape.
/// `count` is always `array.len() / element_type.size()`.
#[derive(Debug, Clone)]
pub struct AccessorData {
    pub element_type: ElementType,
    pub normalized: bool,
    /// When set, only non-zero elements are persisted on write.
    pub sparse: bool,
    pub array: Option<ScalarArray>,
    pub buffer: Ref,
}

impl AccessorData {
    pub fn new() -> Self {
        Self {
            element_type: ElementType::Scalar,
            normalized: false,
            sparse: false,
            array: None,
            buffer: Ref::default(),
        }
    }

    pub fn element_size(&self) -> usize {
        self.element_type.size()
    }

    pub fn component_type(&self) -> ComponentType {
        self.array
            .as_ref()
            .map(|a| a.component_type())
            .unwrap_or(ComponentType::F32)
    }

    /// Number of elements in the accessor.
    pub fn count(&self) -> usize {
        self.array
            .as_ref()
            .map(|a| a.len() / self.element_size())
            .unwrap_or(0)
    }

    /// Reads one element into `out`, applying normalization when enabled.
    /// `out` must hold at least `element_size` components.
    pub fn element(&self, index: usize, out: &mut [f64]) {
        let size = self.element_size();
        let array = match &self.array {
            Some(array) => array,
            None => return,
        };
        let component_type = array.component_type();
        for (j, slot) in out.iter_mut().enumerate().take(size) {
            let raw = array.get(index * size + j);
            *slot = if self.normalized {
                decode_normalized(raw, component_type)
            } else {
                raw
            };
        }
    }

    /// Writes one element from `value`, applying the inverse normalization
    /// mapping when enabled.
    pub fn set_element(&mut self, index: usize, value: &[f64]) {
        let size = self.element_size();
        let normalized = self.normalized;
        let array = match &mut self.array {
            Some(array) => array,
            None => return,
        };
        let component_type = array.component_type();
        for (j, &v) in value.iter().enumerate().take(size) {
            let raw = if normalized {
                encode_normalized(v, component_type)
            } else {
                v
            };
            array.set(index * size + j, raw);
        }
    }

    /// Per-component minimum and maximum over all elements, in the same
    /// (possibly normalized) space as [`AccessorData::element`]. Non-finite
    /// components are skipped. Returns `None` for an empty accessor.
    pub fn min_max(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let count = self.count();
        if count == 0 {
            return None;
        }
        let size = self.element_size();
        let mut min = vec![f64::INFINITY; size];
        let mut max = vec![f64::NEG_INFINITY; size];
        let mut element = vec![0.0; size];
        for i in 0..count {
            self.element(i, &mut element);
            for j in 0..size {
                if element[j].is_finite() {
                    min[j] = min[j].min(element[j]);
                    max[j] = max[j].max(element[j]);
                }
            }
        }
        Some((min, max))
    }
}

impl Default for AccessorData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn count_follows_array_and_type() {
        let mut accessor = AccessorData::new();
        accessor.element_type = ElementType::Vec3;
        accessor.array = Some(ScalarArray::F32(vec![0.0; 12]));
        assert_eq!(4, accessor.count());

        accessor.element_type = ElementType::Vec4;
        assert_eq!(3, accessor.count());

        accessor.array = Some(ScalarArray::U16(vec![0; 8]));
        assert_eq!(2, accessor.count());
        assert_eq!(ComponentType::U16, accessor.component_type());
    }

    #[test]
    fn normalized_round_trip_u8() {
        let mut accessor = AccessorData::new();
        accessor.element_type = ElementType::Scalar;
        accessor.normalized = true;
        accessor.array = Some(ScalarArray::U8(vec![0; 4]));

        let values = [0.0, 0.25, 0.5, 1.0];
        for (i, &v) in values.iter().enumerate() {
            accessor.set_element(i, &[v]);
        }

        let mut out = [0.0];
        for (i, &v) in values.iter().enumerate() {
            accessor.element(i, &mut out);
            assert!((out[0] - v).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn normalized_round_trip_i16() {
        let mut accessor = AccessorData::new();
        accessor.element_type = ElementType::Vec2;
        accessor.normalized = true;
        accessor.array = Some(ScalarArray::I16(vec![0; 4]));

        accessor.set_element(0, &[-1.0, 0.5]);
        accessor.set_element(1, &[1.0, -0.25]);

        let mut out = [0.0, 0.0];
        accessor.element(0, &mut out);
        assert!((out[0] + 1.0).abs() <= 1.0 / 32767.0);
        assert!((out[1] - 0.5).abs() <= 1.0 / 32767.0);

        accessor.element(1, &mut out);
        assert_eq!(1.0, out[0]);
    }

    #[test]
    fn min_max_uses_element_space() {
        let mut accessor = AccessorData::new();
        accessor.element_type = ElementType::Vec2;
        accessor.array = Some(ScalarArray::F32(vec![1.0, -2.0, 3.0, 0.5]));

        let (min, max) = accessor.min_max().unwrap();
        assert_eq!(vec![1.0, -2.0], min);
        assert_eq!(vec![3.0, 0.5], max);
    }
}
