//! # Protocol Frames
//!
//! Defines the request and reply bodies of a transaction.
//!
//! ## Wire Format
//! - **Call**: `[descriptor: str][params: per registry, fixed order]`
//! - **Reply**: `[status: s32][message: str, iff status != 0][result: iff status == 0 and declared]`
//!
//! The transaction code is not part of either body; the transport carries it.
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on unknown data.
//! - **Strict Order**: Parameters are read in exactly the order the registry lists them,
//!   and a body with bytes left over is rejected.
//! - **Status First**: A failure reply is recognised before any result bytes are touched.

use showerpack::Decoder;
use showerpack::Encoder;
use showerpack::Handle;

use crate::error::Error;
use crate::error::ExceptionCode;
use crate::error::Failure;
use crate::error::Result;
use crate::registry::Method;
use crate::registry::WireType;
use crate::registry::DESCRIPTOR;

/// A typed value travelling in a transaction body.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    S32(i32),
    S64(i64),
    F32(f32),
    Str(String),
    Bytes(Vec<u8>),
    Handle(Handle),
}

impl Arg {
    pub fn wire_type(&self) -> WireType {
        match self {
            Arg::S32(_) => WireType::S32,
            Arg::S64(_) => WireType::S64,
            Arg::F32(_) => WireType::F32,
            Arg::Str(_) => WireType::Str,
            Arg::Bytes(_) => WireType::Bytes,
            Arg::Handle(_) => WireType::Handle,
        }
    }

    pub fn as_s32(&self) -> Option<i32> {
        match self { Arg::S32(v) => Some(*v), _ => None }
    }

    pub fn as_s64(&self) -> Option<i64> {
        match self { Arg::S64(v) => Some(*v), _ => None }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self { Arg::F32(v) => Some(*v), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Arg::Str(v) => Some(v.as_str()), _ => None }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self { Arg::Handle(v) => Some(*v), _ => None }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self { Arg::Bytes(v) => Some(v), _ => None }
    }
}

/// Writes one value.
pub fn encode_arg(enc: &mut Encoder, arg: &Arg) -> Result<()> {
    match arg {
        Arg::S32(v) => enc.s32(*v),
        Arg::S64(v) => enc.s64(*v),
        Arg::F32(v) => enc.f32(*v),
        Arg::Str(v) => enc.str(v)?,
        Arg::Bytes(v) => enc.bytes(v)?,
        Arg::Handle(v) => enc.handle(*v),
    }
    Ok(())
}

/// Reads one value of the expected type.
pub fn decode_arg(dec: &mut Decoder, ty: WireType) -> Result<Arg> {
    Ok(match ty {
        WireType::S32 => Arg::S32(dec.s32()?),
        WireType::S64 => Arg::S64(dec.s64()?),
        WireType::F32 => Arg::F32(dec.f32()?),
        WireType::Str => Arg::Str(dec.str()?.to_string()),
        WireType::Bytes => Arg::Bytes(dec.bytes()?.to_vec()),
        WireType::Handle => Arg::Handle(dec.handle()?),
    })
}

fn check_signature(method: Method, args: &[Arg]) -> Result<()> {
    let spec = method.spec();
    if args.len() != spec.params.len() {
        return Err(Error::ArityMismatch {
            method: spec.name,
            expected: spec.params.len(),
            found: args.len(),
        });
    }
    for (arg, &expected) in args.iter().zip(spec.params) {
        let found = arg.wire_type();
        if found != expected {
            return Err(Error::TypeMismatch { method: spec.name, expected, found });
        }
    }
    Ok(())
}

fn ensure_consumed(dec: &Decoder, what: &str) -> Result<()> {
    if dec.remaining() != 0 {
        return Err(Error::ProtocolViolation(format!(
            "{} trailing bytes after {}", dec.remaining(), what
        )));
    }
    Ok(())
}

/// Encodes an outbound call body.
pub struct CallEncoder<'a> {
    pub descriptor: &'a str,
    pub method: Method,
    pub args: &'a [Arg],
}

impl<'a> CallEncoder<'a> {
    /// A call carrying the interface's own descriptor.
    pub fn new(method: Method, args: &'a [Arg]) -> Self {
        Self { descriptor: DESCRIPTOR, method, args }
    }

    /// A call carrying an arbitrary descriptor token.
    pub fn with_descriptor(descriptor: &'a str, method: Method, args: &'a [Arg]) -> Self {
        Self { descriptor, method, args }
    }

    /// Encode this call into the encoder.
    ///
    /// Arguments are checked against the registry before anything is written.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        check_signature(self.method, self.args)?;
        enc.str(self.descriptor)?;
        for arg in self.args {
            encode_arg(enc, arg)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

/// Reads the descriptor token at the head of a call body and checks it.
///
/// Returns the decoder positioned at the first parameter.
pub fn enforce_interface<'a>(bytes: &'a [u8], expected: &str) -> Result<Decoder<'a>> {
    let mut dec = Decoder::new(bytes);
    let found = dec.str()?;
    if found != expected {
        return Err(Error::DescriptorMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(dec)
}

/// Decodes an inbound call body.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDecoder {
    pub method: Method,
    pub args: Vec<Arg>,
}

impl CallDecoder {
    /// Decode a call for `method`, verifying the descriptor against `expected`.
    pub fn decode(expected: &str, method: Method, bytes: &[u8]) -> Result<Self> {
        let mut dec = enforce_interface(bytes, expected)?;
        let params = method.spec().params;
        let mut args = Vec::with_capacity(params.len());
        for &ty in params {
            args.push(decode_arg(&mut dec, ty)?);
        }
        ensure_consumed(&dec, method.name())?;
        Ok(CallDecoder { method, args })
    }
}

/// Encodes an outbound reply body.
pub enum ReplyEncoder<'a> {
    Ok(Option<&'a Arg>),
    Err { code: ExceptionCode, message: &'a str },
}

impl<'a> ReplyEncoder<'a> {
    pub fn ok(result: Option<&'a Arg>) -> Self {
        Self::Ok(result)
    }

    pub fn err(code: ExceptionCode, message: &'a str) -> Self {
        Self::Err { code, message }
    }

    /// Encode this reply into the encoder.
    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Self::Ok(result) => {
                enc.s32(ExceptionCode::Ok.as_i32());
                if let Some(arg) = result {
                    encode_arg(enc, arg)?;
                }
            }
            Self::Err { code, message } => {
                if code.is_ok() {
                    return Err(Error::ProtocolViolation("failure reply with zero status".into()));
                }
                enc.s32(code.as_i32());
                enc.str(message)?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

/// Decodes an inbound reply body.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyDecoder {
    /// - `Ok(Some(arg))`: success with the method's declared result.
    /// - `Ok(None)`: success, the method declares no result.
    /// - `Err(Failure)`: the remote side reported a failure.
    pub status: std::result::Result<Option<Arg>, Failure>,
}

impl ReplyDecoder {
    /// Decode a reply to `method`.
    pub fn decode(method: Method, bytes: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(bytes);
        let code = ExceptionCode::from_i32(dec.s32()?);

        if !code.is_ok() {
            // Nothing past the message is read on a failure reply.
            let message = dec.str()?.to_string();
            return Ok(ReplyDecoder { status: Err(Failure { code, message }) });
        }

        let result = match method.spec().result {
            Some(ty) => Some(decode_arg(&mut dec, ty)?),
            None => None,
        };
        ensure_consumed(&dec, method.name())?;
        Ok(ReplyDecoder { status: Ok(result) })
    }
}

/// Encodes the reply to an interface interrogation.
pub fn encode_interface_reply(enc: &mut Encoder, descriptor: &str) -> Result<()> {
    enc.s32(ExceptionCode::Ok.as_i32());
    enc.str(descriptor)?;
    Ok(())
}

/// Decodes the reply to an interface interrogation.
pub fn decode_interface_reply(bytes: &[u8]) -> Result<std::result::Result<String, Failure>> {
    let mut dec = Decoder::new(bytes);
    let code = ExceptionCode::from_i32(dec.s32()?);
    let text = dec.str()?.to_string();
    if code.is_ok() {
        Ok(Ok(text))
    } else {
        Ok(Err(Failure { code, message: text }))
    }
}
