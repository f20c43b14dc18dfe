//! Render cache of the entity grid.
//!
//! Every layer is a flat vector indexed by `row * column_count + col`, so the
//! cache is only valid for one row order and one column set. All mutation
//! goes through [`CellCache`]; nothing else touches the layers.

use super::cells::{CellStyle, SafeHtml};

#[derive(Debug, Default)]
pub struct CellCache {
    column_count: usize,
    header_styles: Vec<Option<CellStyle>>,
    content: Vec<Option<SafeHtml>>,
    /// The inner `None` records "no tooltip" so it is not recomputed.
    tooltips: Vec<Option<Option<String>>>,
    styles: Vec<Option<CellStyle>>,
}

fn slot<V>(layer: &mut Vec<Option<V>>, index: usize) -> &mut Option<V> {
    if layer.len() <= index {
        layer.resize_with(index + 1, || None);
    }
    &mut layer[index]
}

fn get_or_insert<V: Clone>(layer: &mut Vec<Option<V>>, index: usize, compute: impl FnOnce() -> V) -> V {
    slot(layer, index).get_or_insert_with(compute).clone()
}

impl CellCache {
    pub fn new(column_count: usize) -> Self {
        Self {
            column_count,
            ..Self::default()
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Adopts a new column set, dropping every layer.
    pub fn set_column_count(&mut self, column_count: usize) {
        self.column_count = column_count;
        self.invalidate_all();
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.column_count + col
    }

    pub fn invalidate_all(&mut self) {
        self.header_styles.clear();
        self.content.clear();
        self.tooltips.clear();
        self.styles.clear();
    }

    /// Drops the content, tooltip and style of one cell.
    pub fn invalidate_cell(&mut self, row: usize, col: usize) {
        let index = self.index(row, col);
        if let Some(v) = self.content.get_mut(index) {
            *v = None;
        }
        if let Some(v) = self.tooltips.get_mut(index) {
            *v = None;
        }
        if let Some(v) = self.styles.get_mut(index) {
            *v = None;
        }
    }

    /// Drops one column in every row, header included.
    pub fn invalidate_column(&mut self, col: usize) {
        if let Some(v) = self.header_styles.get_mut(col) {
            *v = None;
        }
        if self.column_count == 0 {
            return;
        }
        let cached_rows = self
            .content
            .len()
            .max(self.tooltips.len())
            .max(self.styles.len())
            .div_ceil(self.column_count);
        for row in 0..cached_rows {
            self.invalidate_cell(row, col);
        }
    }

    pub fn header_style(&mut self, col: usize, compute: impl FnOnce() -> CellStyle) -> CellStyle {
        get_or_insert(&mut self.header_styles, col, compute)
    }

    pub fn content(&mut self, row: usize, col: usize, compute: impl FnOnce() -> SafeHtml) -> SafeHtml {
        let index = self.index(row, col);
        get_or_insert(&mut self.content, index, compute)
    }

    pub fn tooltip(&mut self, row: usize, col: usize, compute: impl FnOnce() -> Option<String>) -> Option<String> {
        let index = self.index(row, col);
        get_or_insert(&mut self.tooltips, index, compute)
    }

    pub fn style(&mut self, row: usize, col: usize, compute: impl FnOnce() -> CellStyle) -> CellStyle {
        let index = self.index(row, col);
        get_or_insert(&mut self.styles, index, compute)
    }

    pub fn cached_content(&self, row: usize, col: usize) -> Option<&SafeHtml> {
        self.content.get(self.index(row, col)).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.header_styles.iter().all(Option::is_none)
            && self.content.iter().all(Option::is_none)
            && self.tooltips.iter().all(Option::is_none)
            && self.styles.iter().all(Option::is_none)
    }
}
