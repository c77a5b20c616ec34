//! Field-descriptor tables
//!
//! libchadwick describes its output columns in two global arrays of
//! `{ f, header, description }` rows, each paired with an `int` array of
//! enabled flags. A flag of exactly 1 means the column is written.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use serde::Serialize;

use crate::ffi::DynamicLibrary;
use crate::native::{
    symbols, CWEventFieldStruct, ExtFieldData, ExtFieldFlags, FieldData, FieldFlags,
    EXT_FIELDS_COUNT, FIELDS_COUNT,
};
use crate::ChadwickResult;

/// Which of the two tables a field lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Standard,
    Extended,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Standard => f.pad("standard"),
            FieldKind::Extended => f.pad("extended"),
        }
    }
}

/// A snapshot of one table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub index: usize,
    pub header: String,
    pub description: String,
    pub enabled: bool,
}

/// View over one descriptor array and its flag array
pub struct FieldTable {
    kind: FieldKind,
    rows: *const CWEventFieldStruct,
    flags: *mut c_int,
    len: usize,
    headers: Vec<String>,
    _owner: Option<Arc<DynamicLibrary>>,
}

impl FieldTable {
    /// Build a view over `len` rows and `len` flags.
    ///
    /// Header strings are copied out once; they are static in the library.
    ///
    /// # Safety
    ///
    /// `rows` and `flags` must be valid for `len` elements for as long as
    /// the table is used, and every non-null `header` must point to a
    /// NUL-terminated string.
    pub unsafe fn from_raw(
        kind: FieldKind,
        rows: *const CWEventFieldStruct,
        flags: *mut c_int,
        len: usize,
    ) -> Self {
        let headers = (0..len)
            .map(|i| cstr_lossy((*rows.add(i)).header))
            .collect();
        Self {
            kind,
            rows,
            flags,
            len,
            headers,
            _owner: None,
        }
    }

    /// Resolve one of the library's two tables.
    pub fn from_library(library: &Arc<DynamicLibrary>, kind: FieldKind) -> ChadwickResult<Self> {
        // Safety: the array types mirror the native globals' declared sizes.
        let mut table = unsafe {
            match kind {
                FieldKind::Standard => {
                    let rows = library.data::<FieldData>(symbols::FIELD_DATA)?;
                    let flags = library.data::<FieldFlags>(symbols::FIELDS)?;
                    Self::from_raw(kind, rows.cast(), flags.cast(), FIELDS_COUNT)
                }
                FieldKind::Extended => {
                    let rows = library.data::<ExtFieldData>(symbols::EXT_FIELD_DATA)?;
                    let flags = library.data::<ExtFieldFlags>(symbols::EXT_FIELDS)?;
                    Self::from_raw(kind, rows.cast(), flags.cast(), EXT_FIELDS_COUNT)
                }
            }
        };
        table._owner = Some(Arc::clone(library));
        Ok(table)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Header names in table order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn position(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn flag(&self, index: usize) -> Option<c_int> {
        if index >= self.len {
            return None;
        }
        // Safety: bounds checked above, validity guaranteed at construction.
        Some(unsafe { *self.flags.add(index) })
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.flag(index) == Some(1)
    }

    /// Write a flag; returns `false` when `index` is out of range.
    pub fn set_flag(&self, index: usize, value: c_int) -> bool {
        if index >= self.len {
            return false;
        }
        // Safety: bounds checked above, validity guaranteed at construction.
        unsafe { *self.flags.add(index) = value };
        true
    }

    pub fn set_all(&self, value: c_int) {
        for i in 0..self.len {
            self.set_flag(i, value);
        }
    }

    /// Enabled headers in table order
    pub fn active_headers(&self) -> impl Iterator<Item = &str> + '_ {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_enabled(*i))
            .map(|(_, h)| h.as_str())
    }

    pub fn descriptor(&self, index: usize) -> Option<FieldDescriptor> {
        if index >= self.len {
            return None;
        }
        // Safety: bounds checked above.
        let description = unsafe { cstr_lossy((*self.rows.add(index)).description) };
        Some(FieldDescriptor {
            kind: self.kind,
            index,
            header: self.headers[index].clone(),
            description,
            enabled: self.is_enabled(index),
        })
    }

    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        (0..self.len).filter_map(|i| self.descriptor(i)).collect()
    }
}

/// The standard table followed by the extended table
pub struct FieldTables {
    pub standard: FieldTable,
    pub extended: FieldTable,
}

impl FieldTables {
    pub fn new(standard: FieldTable, extended: FieldTable) -> Self {
        Self { standard, extended }
    }

    pub fn from_library(library: &Arc<DynamicLibrary>) -> ChadwickResult<Self> {
        Ok(Self {
            standard: FieldTable::from_library(library, FieldKind::Standard)?,
            extended: FieldTable::from_library(library, FieldKind::Extended)?,
        })
    }

    /// Every header, standard first
    pub fn all_headers(&self) -> Vec<String> {
        self.standard
            .headers()
            .iter()
            .chain(self.extended.headers())
            .cloned()
            .collect()
    }

    /// Locate a header; the standard table wins if both contain it.
    pub fn lookup(&self, header: &str) -> Option<(FieldKind, usize)> {
        if let Some(i) = self.standard.position(header) {
            return Some((FieldKind::Standard, i));
        }
        self.extended
            .position(header)
            .map(|i| (FieldKind::Extended, i))
    }

    pub fn table(&self, kind: FieldKind) -> &FieldTable {
        match kind {
            FieldKind::Standard => &self.standard,
            FieldKind::Extended => &self.extended,
        }
    }

    /// Set the flag for `header`. Unknown headers are logged and skipped.
    pub fn set_value(&self, header: &str, value: c_int) -> bool {
        match self.lookup(header) {
            Some((kind, index)) => self.table(kind).set_flag(index, value),
            None => {
                tracing::warn!("field_name {} is not in the headers. value NOT set", header);
                false
            }
        }
    }

    pub fn set_all(&self, value: c_int) {
        self.standard.set_all(value);
        self.extended.set_all(value);
    }

    /// Enable exactly `headers`, disabling everything else.
    ///
    /// Returns the names that matched no field.
    pub fn select<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        self.set_all(0);
        headers
            .iter()
            .map(|h| h.as_ref())
            .filter(|h| !self.set_value(h, 1))
            .map(str::to_string)
            .collect()
    }

    /// Enabled standard headers, then enabled extended headers
    pub fn active_headers(&self) -> Vec<String> {
        self.standard
            .active_headers()
            .chain(self.extended.active_headers())
            .map(str::to_string)
            .collect()
    }

    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        let mut all = self.standard.descriptors();
        all.extend(self.extended.descriptors());
        all
    }
}

/// Copy a possibly-null C string.
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated string.
pub(crate) unsafe fn cstr_lossy(ptr: *const std::os::raw::c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    struct Fixture {
        _strings: Vec<CString>,
        rows: Vec<CWEventFieldStruct>,
        flags: Vec<c_int>,
    }

    fn fixture(headers: &[&str]) -> Fixture {
        let strings: Vec<CString> = headers.iter().map(|h| CString::new(*h).unwrap()).collect();
        let rows = strings
            .iter()
            .map(|s| CWEventFieldStruct {
                f: None,
                header: s.as_ptr(),
                description: std::ptr::null(),
            })
            .collect();
        Fixture {
            _strings: strings,
            rows,
            flags: vec![0; headers.len()],
        }
    }

    fn table(kind: FieldKind, fx: &mut Fixture) -> FieldTable {
        unsafe { FieldTable::from_raw(kind, fx.rows.as_ptr(), fx.flags.as_mut_ptr(), fx.rows.len()) }
    }

    #[test]
    fn test_headers_and_flags() {
        let mut fx = fixture(&["GAME_ID", "INN_CT", "EVENT_TX"]);
        let t = table(FieldKind::Standard, &mut fx);

        assert_eq!(t.headers(), ["GAME_ID", "INN_CT", "EVENT_TX"]);
        assert_eq!(t.position("INN_CT"), Some(1));
        assert!(!t.is_enabled(1));
        assert!(t.set_flag(1, 1));
        assert!(t.is_enabled(1));
        assert!(!t.set_flag(3, 1));
        assert_eq!(t.flag(3), None);
        assert_eq!(t.active_headers().collect::<Vec<_>>(), ["INN_CT"]);
    }

    #[test]
    fn test_only_flag_one_counts_as_enabled() {
        let mut fx = fixture(&["A", "B"]);
        let t = table(FieldKind::Standard, &mut fx);
        t.set_flag(0, 2);
        t.set_flag(1, 1);
        assert_eq!(t.active_headers().collect::<Vec<_>>(), ["B"]);
    }

    #[test]
    fn test_descriptor_with_null_description() {
        let mut fx = fixture(&["GAME_ID"]);
        let t = table(FieldKind::Extended, &mut fx);
        let d = t.descriptor(0).unwrap();
        assert_eq!(d.kind, FieldKind::Extended);
        assert_eq!(d.header, "GAME_ID");
        assert_eq!(d.description, "");
        assert!(!d.enabled);
    }
}
