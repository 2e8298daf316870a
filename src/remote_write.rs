//! Prometheus remote-write wire types and the snappy/protobuf codec.
//!
//! Field tags follow `prompb/remote.proto` and `prompb/types.proto`.

use prost::Message;

pub const NAME_LABEL: &str = "__name__";

#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

impl WriteRequest {
    pub fn sample_count(&self) -> usize {
        self.timeseries.iter().map(|ts| ts.samples.len()).sum()
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("protobuf encode: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("protobuf decode: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("snappy: {0}")]
    Snappy(#[from] snap::Error),
}

/// Serializes the request and compresses it with snappy block format.
pub fn encode(req: &WriteRequest) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(req.encoded_len());
    req.encode(&mut buf)?;
    Ok(snap::raw::Encoder::new().compress_vec(&buf)?)
}

pub fn decode(body: &[u8]) -> Result<WriteRequest, CodecError> {
    let buf = snap::raw::Decoder::new().decompress_vec(body)?;
    Ok(WriteRequest::decode(buf.as_slice())?)
}
