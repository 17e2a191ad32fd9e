//! LibXML2 FFI Wrapper Module
//!
//! Safe wrappers around the handful of libxml2 calls this crate needs: compiling an XSD from
//! disk (so that relative `xs:include`/`xs:import` references resolve against the fetched
//! schema directory), parsing an XML document from memory, and validating a parsed document.
//!
//! Every call that can produce diagnostics installs a structured error handler for its
//! duration, so messages are collected into a `Vec<String>` instead of being printed by
//! libxml2's default handler.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Once};

use libc::{c_char, c_int};

use crate::error::{LibXml2Error, LibXml2Result};

/// libxml2's initialization functions are NOT thread-safe, so they run exactly once.
static LIBXML2_INIT: Once = Once::new();

/// Parser option: forbid network access
pub const XML_PARSE_NONET: c_int = 1 << 11;
/// Parser option: relax hardcoded parser limits
pub const XML_PARSE_HUGE: c_int = 1 << 19;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut libc::c_void,
    pub node: *mut libc::c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut libc::c_void, error: *mut xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub static xmlParserVersion: *const c_char;

    pub fn xmlInitParser();

    pub fn xmlSetStructuredErrorFunc(ctx: *mut libc::c_void, handler: XmlStructuredErrorFunc);

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);

    // Schema parsing
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *const XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

/// Callback for libxml2 to report errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut libc::c_void, error: *mut xmlError) {
    let errors = unsafe { &mut *(user_data as *mut Vec<String>) };

    if !error.is_null() {
        let msg_ptr = unsafe { (*error).message };
        if !msg_ptr.is_null() {
            let c_str = unsafe { CStr::from_ptr(msg_ptr) };
            let line = unsafe { (*error).line };
            let message = c_str.to_string_lossy().trim().to_string();
            if line > 0 {
                errors.push(format!("line {}: {}", line, message));
            } else {
                errors.push(message);
            }
        }
    }
}

/// libxml2 runtime version, decoded from `xmlParserVersion` ("21302" → 2.13.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LibXml2Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl LibXml2Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Decode libxml2's integer version string
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = raw.trim();
        let number: u32 = digits
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .ok()?;
        Some(Self {
            major: number / 10000,
            minor: (number / 100) % 100,
            patch: number % 100,
        })
    }
}

impl std::fmt::Display for LibXml2Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Thread-safe wrapper for libxml2 schema pointer with proper resource management
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 xmlSchema structures are thread-safe for reading after parsing.
// See: http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// The pointer must come from `xmlSchemaParse` and must not be freed elsewhere.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed { errors: Vec::new() });
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// A parsed XML document, freed on drop
#[derive(Debug)]
pub struct XmlDocument {
    ptr: *mut XmlDoc,
    /// Non-fatal diagnostics emitted while parsing
    pub warnings: Vec<String>,
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Outcome of validating a parsed document against a compiled schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentVerdict {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<String>,
    },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl DocumentVerdict {
    /// Create a verdict from libxml2 return code and captured errors
    pub fn from_code(code: c_int, errors: Vec<String>) -> Self {
        match code {
            0 => DocumentVerdict::Valid,
            n if n > 0 => DocumentVerdict::Invalid {
                error_count: n,
                errors,
            },
            n => DocumentVerdict::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DocumentVerdict::Valid)
    }
}

/// Safe access to the libxml2 functionality used by the validators
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new wrapper, initializing libxml2 on first use
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Version of the libxml2 library linked at runtime, if it can be decoded
    pub fn runtime_version(&self) -> Option<LibXml2Version> {
        unsafe {
            let raw = xmlParserVersion;
            if raw.is_null() {
                return None;
            }
            LibXml2Version::parse(&CStr::from_ptr(raw).to_string_lossy())
        }
    }

    /// Compile the schema stored at `path`.
    ///
    /// Relative includes and imports are resolved by libxml2 against the file's location.
    pub fn parse_schema_file(&self, path: &Path) -> LibXml2Result<XmlSchemaPtr> {
        let path_str = path.to_str().ok_or_else(|| LibXml2Error::InvalidPath {
            path: path.to_path_buf(),
        })?;
        let c_path = CString::new(path_str).map_err(|_| LibXml2Error::InvalidPath {
            path: path.to_path_buf(),
        })?;

        unsafe {
            let parser_ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }
            Self::finish_schema_parse(parser_ctxt)
        }
    }

    /// # Safety
    ///
    /// `parser_ctxt` must be a live parser context; it is freed before returning.
    unsafe fn finish_schema_parse(
        parser_ctxt: *mut XmlSchemaParserCtxt,
    ) -> LibXml2Result<XmlSchemaPtr> {
        let mut errors: Vec<String> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<String> as *mut libc::c_void;

        unsafe {
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );
            // Document-level parse errors of the XSD itself go through the global handler.
            xmlSetStructuredErrorFunc(errors_ptr, Some(structured_error_callback));

            let schema_ptr = xmlSchemaParse(parser_ctxt);

            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            xmlSchemaFreeParserCtxt(parser_ctxt);

            if schema_ptr.is_null() {
                return Err(LibXml2Error::SchemaParseFailed { errors });
            }
            XmlSchemaPtr::from_raw(schema_ptr)
        }
    }

    /// Parse an XML document from memory with the given libxml2 parser options
    pub fn parse_document(&self, xml: &[u8], options: c_int) -> LibXml2Result<XmlDocument> {
        let size = c_int::try_from(xml.len())
            .map_err(|_| LibXml2Error::DocumentTooLarge { size: xml.len() })?;

        let mut errors: Vec<String> = Vec::new();
        let errors_ptr = &mut errors as *mut Vec<String> as *mut libc::c_void;

        let doc = unsafe {
            xmlSetStructuredErrorFunc(errors_ptr, Some(structured_error_callback));
            let doc = xmlReadMemory(
                xml.as_ptr() as *const c_char,
                size,
                std::ptr::null(),
                std::ptr::null(),
                options,
            );
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            doc
        };

        if doc.is_null() {
            return Err(LibXml2Error::DocumentParseFailed { errors });
        }

        Ok(XmlDocument {
            ptr: doc,
            warnings: errors,
        })
    }

    /// Validate a parsed document against a compiled schema
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        document: &XmlDocument,
    ) -> LibXml2Result<DocumentVerdict> {
        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut errors: Vec<String> = Vec::new();
            let errors_ptr = &mut errors as *mut Vec<String> as *mut libc::c_void;
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                errors_ptr,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, document.ptr);

            xmlSchemaFreeValidCtxt(valid_ctxt);

            let verdict = DocumentVerdict::from_code(result_code, errors);
            if let DocumentVerdict::InternalError { code } = verdict {
                return Err(LibXml2Error::InternalError { code });
            }

            Ok(verdict)
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
