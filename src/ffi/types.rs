//! FFI Type System
//!
//! Argument and return shapes used to declare native function signatures
//! before calling into a loaded library.

use std::ffi::CString;
use std::fmt;
use std::str::FromStr;

use super::FfiError;

/// Integer-class value shapes that can cross the C ABI through a general
/// purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfiType {
    /// No value (`void`)
    Void,
    /// `int8_t` / `signed char`
    I8,
    /// `uint8_t` / `unsigned char`
    U8,
    /// `int16_t` / `short`
    I16,
    /// `uint16_t`
    U16,
    /// `int32_t` / `int`
    I32,
    /// `uint32_t` / `unsigned int`
    U32,
    /// `int64_t` / `long` on LP64
    I64,
    /// `uint64_t` / `size_t` on LP64
    U64,
    /// Opaque pointer (`void*`, `FILE*`, `CWGame*`, ...)
    Ptr,
    /// Null-terminated C string (`char*`)
    CStr,
}

impl FfiType {
    /// Size in bytes of this type on the current platform
    pub fn size(&self) -> usize {
        match self {
            FfiType::Void => 0,
            FfiType::I8 | FfiType::U8 => 1,
            FfiType::I16 | FfiType::U16 => 2,
            FfiType::I32 | FfiType::U32 => 4,
            FfiType::I64 | FfiType::U64 => 8,
            FfiType::Ptr | FfiType::CStr => std::mem::size_of::<usize>(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FfiType::I8
                | FfiType::U8
                | FfiType::I16
                | FfiType::U16
                | FfiType::I32
                | FfiType::U32
                | FfiType::I64
                | FfiType::U64
        )
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, FfiType::Ptr | FfiType::CStr)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            FfiType::I8 | FfiType::I16 | FfiType::I32 | FfiType::I64
        )
    }

    /// Narrow a raw 64-bit return register to this type.
    ///
    /// Only the low `size()` bytes of the register are defined by the ABI,
    /// so the rest is masked off (and sign-extended for signed types).
    pub fn narrow(&self, raw: u64) -> u64 {
        match self {
            FfiType::Void => 0,
            FfiType::I8 => raw as i8 as i64 as u64,
            FfiType::U8 => raw as u8 as u64,
            FfiType::I16 => raw as i16 as i64 as u64,
            FfiType::U16 => raw as u16 as u64,
            FfiType::I32 => raw as i32 as i64 as u64,
            FfiType::U32 => raw as u32 as u64,
            FfiType::I64 | FfiType::U64 | FfiType::Ptr | FfiType::CStr => raw,
        }
    }
}

impl FromStr for FfiType {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "void" => Ok(FfiType::Void),
            "i8" | "int8_t" | "char" | "signed char" => Ok(FfiType::I8),
            "u8" | "uint8_t" | "unsigned char" => Ok(FfiType::U8),
            "i16" | "int16_t" | "short" => Ok(FfiType::I16),
            "u16" | "uint16_t" | "unsigned short" => Ok(FfiType::U16),
            "i32" | "int32_t" | "int" => Ok(FfiType::I32),
            "u32" | "uint32_t" | "unsigned" | "unsigned int" => Ok(FfiType::U32),
            "i64" | "int64_t" | "long" => Ok(FfiType::I64),
            "u64" | "uint64_t" | "size_t" | "unsigned long" => Ok(FfiType::U64),
            "ptr" | "pointer" | "void*" | "void *" | "file*" | "file *" => Ok(FfiType::Ptr),
            "cstr" | "char*" | "char *" | "const char*" | "const char *" => Ok(FfiType::CStr),
            // Any other pointer to a native struct is opaque to us.
            other if other.ends_with('*') => Ok(FfiType::Ptr),
            other => Err(FfiError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FfiType::Void => "void",
            FfiType::I8 => "i8",
            FfiType::U8 => "u8",
            FfiType::I16 => "i16",
            FfiType::U16 => "u16",
            FfiType::I32 => "i32",
            FfiType::U32 => "u32",
            FfiType::I64 => "i64",
            FfiType::U64 => "u64",
            FfiType::Ptr => "ptr",
            FfiType::CStr => "cstr",
        };
        f.write_str(name)
    }
}

/// A value passed to or returned from a native call
#[derive(Debug, Clone, PartialEq)]
pub enum FfiValue {
    /// No value
    Void,
    /// Any integer type, widened to 64 bits
    Integer(u64),
    /// Raw address
    Pointer(usize),
    /// Owned C string; its buffer stays alive for the duration of the call
    String(CString),
}

impl FfiValue {
    /// Build an argument from a Rust string.
    pub fn string(s: &str) -> Result<Self, FfiError> {
        CString::new(s)
            .map(FfiValue::String)
            .map_err(|_| FfiError::ConversionError(format!("interior NUL in {:?}", s)))
    }

    /// Interpret a raw register value as `ty`
    pub fn from_raw(raw: u64, ty: FfiType) -> Self {
        match ty {
            FfiType::Void => FfiValue::Void,
            FfiType::Ptr | FfiType::CStr => FfiValue::Pointer(raw as usize),
            _ => FfiValue::Integer(ty.narrow(raw)),
        }
    }

    /// Register representation of this value
    pub fn as_raw(&self) -> u64 {
        match self {
            FfiValue::Void => 0,
            FfiValue::Integer(v) => *v,
            FfiValue::Pointer(p) => *p as u64,
            FfiValue::String(s) => s.as_ptr() as u64,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FfiValue::Integer(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<usize> {
        match self {
            FfiValue::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, FfiValue::Void)
    }

    /// Whether this value can be passed where `ty` is declared
    pub fn fits(&self, ty: FfiType) -> bool {
        match (self, ty) {
            (FfiValue::Void, _) | (_, FfiType::Void) => false,
            (FfiValue::Integer(_), t) => t.is_integer(),
            (FfiValue::Pointer(_), t) => t.is_pointer(),
            (FfiValue::String(_), t) => t == FfiType::CStr || t == FfiType::Ptr,
        }
    }
}

/// Declared signature of a native function: the `argtypes` / `restype` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiSignature {
    /// Exported symbol name
    pub name: String,
    /// Parameter types
    pub params: Vec<FfiType>,
    /// Return type
    pub return_type: FfiType,
    /// Whether extra arguments may follow `params`
    pub variadic: bool,
}

impl FfiSignature {
    pub fn new(name: impl Into<String>, params: Vec<FfiType>, return_type: FfiType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            variadic: false,
        }
    }

    pub fn variadic(name: impl Into<String>, params: Vec<FfiType>, return_type: FfiType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            variadic: true,
        }
    }

    pub fn validate_args(&self, arg_count: usize) -> bool {
        if self.variadic {
            arg_count >= self.params.len()
        } else {
            arg_count == self.params.len()
        }
    }

    /// Parse a C-style prototype such as `"int feof(FILE* stream)"`.
    ///
    /// Parameter names are optional; `void` alone in the parameter list
    /// means no parameters.
    pub fn parse(prototype: &str) -> Result<Self, FfiError> {
        let invalid = || FfiError::InvalidSignature(prototype.to_string());
        let prototype = prototype.trim().trim_end_matches(';');

        let open = prototype.find('(').ok_or_else(invalid)?;
        let close = prototype.rfind(')').ok_or_else(invalid)?;
        if close < open {
            return Err(invalid());
        }

        let (return_type, name) = split_declaration(&prototype[..open]).ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }

        let inner = prototype[open + 1..close].trim();
        let mut params = Vec::new();
        let mut variadic = false;
        if !inner.is_empty() && inner != "void" {
            for param in inner.split(',') {
                let param = param.trim();
                if param == "..." {
                    variadic = true;
                    continue;
                }
                params.push(parse_param(param)?);
            }
        }

        Ok(Self {
            name: name.to_string(),
            params,
            return_type: return_type.parse()?,
            variadic,
        })
    }
}

impl FromStr for FfiSignature {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `"const char *cw_game_info_lookup"` into type and name.
fn split_declaration(decl: &str) -> Option<(String, &str)> {
    let decl = decl.trim();
    let split = decl.rfind(|c: char| c.is_whitespace() || c == '*')?;
    let name = decl[split + 1..].trim();
    let ty = decl[..=split].trim().to_string();
    Some((ty, name))
}

/// A parameter is either a bare type (`int`) or a type with a name (`int x`).
fn parse_param(param: &str) -> Result<FfiType, FfiError> {
    if let Ok(ty) = param.parse::<FfiType>() {
        return Ok(ty);
    }
    let (ty, _name) = split_declaration(param)
        .ok_or_else(|| FfiError::UnknownType(param.to_string()))?;
    ty.parse()
}

impl fmt::Display for FfiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}
