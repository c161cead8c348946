//! # Transaction Registry
//!
//! The single source of truth binding each operation of the shower interface to
//! its transaction code and wire signature. The call encoder, call decoder and
//! reply decoder all read this table; nothing else hard-codes parameter order.
//!
//! ## Invariants
//! - **Append-only**: Codes are assigned contiguously from `FIRST_CALL_TRANSACTION`
//!   in declaration order. Reordering or removing an entry breaks every deployed peer.
//! - **Closed**: An opcode outside the table is not an error here; `Method::from_code`
//!   returns `None` and the dispatcher decides what to do.

/// Identity token exchanged at the head of every call.
pub const DESCRIPTOR: &str = "com.ai.assistance.shower.IShowerService";

/// Reserved code: interface interrogation. Never reaches the implementation.
pub const INTERFACE_TRANSACTION: u32 = 0;

/// First code available to interface methods.
pub const FIRST_CALL_TRANSACTION: u32 = 1;

/// The primitive types a transaction can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    S32,
    S64,
    F32,
    Str,
    Bytes,
    Handle,
}

/// The operations of the shower interface, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    EnsureDisplay,
    DestroyDisplay,
    LaunchApp,
    Tap,
    Swipe,
    TouchDown,
    TouchMove,
    TouchUp,
    InjectKey,
    RequestScreenshot,
    GetDisplayId,
    SetVideoSink,
}

/// Wire signature of one method.
#[derive(Debug)]
pub struct MethodSpec {
    pub method: Method,
    pub name: &'static str,
    pub params: &'static [WireType],
    pub result: Option<WireType>,
}

use WireType::*;

const POINT: &[WireType] = &[F32, F32];

/// Indexed by `code - FIRST_CALL_TRANSACTION`.
pub static METHODS: [MethodSpec; 12] = [
    MethodSpec { method: Method::EnsureDisplay, name: "ensureDisplay", params: &[S32, S32, S32, S32], result: None },
    MethodSpec { method: Method::DestroyDisplay, name: "destroyDisplay", params: &[], result: None },
    MethodSpec { method: Method::LaunchApp, name: "launchApp", params: &[Str], result: None },
    MethodSpec { method: Method::Tap, name: "tap", params: POINT, result: None },
    MethodSpec { method: Method::Swipe, name: "swipe", params: &[F32, F32, F32, F32, S64], result: None },
    MethodSpec { method: Method::TouchDown, name: "touchDown", params: POINT, result: None },
    MethodSpec { method: Method::TouchMove, name: "touchMove", params: POINT, result: None },
    MethodSpec { method: Method::TouchUp, name: "touchUp", params: POINT, result: None },
    MethodSpec { method: Method::InjectKey, name: "injectKey", params: &[S32], result: None },
    MethodSpec { method: Method::RequestScreenshot, name: "requestScreenshot", params: &[], result: Some(Bytes) },
    MethodSpec { method: Method::GetDisplayId, name: "getDisplayId", params: &[], result: Some(S32) },
    MethodSpec { method: Method::SetVideoSink, name: "setVideoSink", params: &[Handle], result: None },
];

impl Method {
    /// Looks up the method bound to a transaction code.
    pub fn from_code(code: u32) -> Option<Method> {
        let index = code.checked_sub(FIRST_CALL_TRANSACTION)? as usize;
        METHODS.get(index).map(|spec| spec.method)
    }

    /// The transaction code of this method.
    pub fn code(self) -> u32 {
        FIRST_CALL_TRANSACTION + self as u32
    }

    pub fn spec(self) -> &'static MethodSpec {
        &METHODS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Iterates all methods in code order.
    pub fn all() -> impl Iterator<Item = Method> {
        METHODS.iter().map(|spec| spec.method)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name(), self.code())
    }
}
