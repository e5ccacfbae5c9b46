use crate::core::ScalarType;
use std::ops::Index;

/// Dense storage for one value of a realized node; dimension 0 is innermost.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    ty: ScalarType,
    extents: Vec<usize>,
    data: Vec<f64>,
}

impl Buffer {
    pub fn new(ty: ScalarType, extents: &[usize]) -> Self {
        let len = extents.iter().product();
        Self {
            ty,
            extents: extents.to_vec(),
            data: vec![0.0; len],
        }
    }

    /// Fills a buffer by evaluating `f` at every coordinate.
    pub fn from_fn(ty: ScalarType, extents: &[usize], f: impl Fn(&[i64]) -> f64) -> Self {
        let mut buffer = Self::new(ty, extents);
        for_each_coordinate(extents, |offset, coords| {
            buffer.data[offset] = ty.normalize(f(coords));
        });
        buffer
    }

    pub fn ty(&self) -> ScalarType {
        self.ty
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn dimensions(&self) -> usize {
        self.extents.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn offset(&self, coords: &[i64]) -> Option<usize> {
        if coords.len() != self.extents.len() {
            return None;
        }
        let mut offset = 0usize;
        let mut stride = 1usize;
        for (coord, extent) in coords.iter().zip(&self.extents) {
            if *coord < 0 || *coord as usize >= *extent {
                return None;
            }
            offset += *coord as usize * stride;
            stride *= extent;
        }
        Some(offset)
    }

    pub fn get(&self, coords: &[i64]) -> Option<f64> {
        self.offset(coords).map(|offset| self.data[offset])
    }
}

/// Visits every coordinate of `extents` in storage order.
pub(crate) fn for_each_coordinate(extents: &[usize], mut f: impl FnMut(usize, &[i64])) {
    if extents.iter().any(|extent| *extent == 0) {
        return;
    }
    let total: usize = extents.iter().product();
    let mut coords = vec![0i64; extents.len()];
    for offset in 0..total {
        f(offset, &coords);
        for (coord, extent) in coords.iter_mut().zip(extents) {
            *coord += 1;
            if (*coord as usize) < *extent {
                break;
            }
            *coord = 0;
        }
    }
}

/// The buffers produced by realizing one node, one per tuple value.
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    buffers: Vec<Buffer>,
}

impl Realization {
    pub(crate) fn new(buffers: Vec<Buffer>) -> Self {
        Self { buffers }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn into_buffers(self) -> Vec<Buffer> {
        self.buffers
    }
}

impl Index<usize> for Realization {
    type Output = Buffer;

    fn index(&self, index: usize) -> &Buffer {
        &self.buffers[index]
    }
}
