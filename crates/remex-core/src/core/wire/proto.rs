// Hand-derived protobuf messages. Tags are part of the wire contract.
use prost::{Message, Oneof};

#[derive(Clone, PartialEq, Message)]
pub(crate) struct ActionEnvelope {
    #[prost(oneof = "EnvelopeBody", tags = "1, 2")]
    pub action: Option<EnvelopeBody>,
}

#[derive(Clone, PartialEq, Oneof)]
pub(crate) enum EnvelopeBody {
    #[prost(message, tag = "1")]
    Property(PropertyActionProto),
    #[prost(message, tag = "2")]
    Method(MethodActionProto),
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct PropertyActionProto {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bytes = "vec", tag = "2")]
    pub target: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub result_id: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub address: Option<AddressProto>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub args: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub kwargs: Vec<KwargProto>,
    #[prost(uint32, tag = "7")]
    pub kind: u32,
    #[prost(bytes = "vec", optional, tag = "8")]
    pub set_value: Option<Vec<u8>>,
    #[prost(bytes = "vec", tag = "9")]
    pub message_id: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct MethodActionProto {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bytes = "vec", tag = "2")]
    pub target: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub result_id: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub address: Option<AddressProto>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub args: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub kwargs: Vec<KwargProto>,
    #[prost(bytes = "vec", tag = "9")]
    pub message_id: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct KwargProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub id: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct AddressProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub network: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub domain: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub device: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub vm: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct StorableObjectProto {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub data: Option<DataProto>,
    #[prost(message, repeated, tag = "3")]
    pub read_permissions: Vec<PermissionProto>,
    #[prost(string, repeated, tag = "4")]
    pub tags: Vec<String>,
    #[prost(string, tag = "5")]
    pub description: String,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct PermissionProto {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub provenance: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct DataProto {
    #[prost(oneof = "DataValue", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub value: Option<DataValue>,
}

#[derive(Clone, PartialEq, Oneof)]
pub(crate) enum DataValue {
    #[prost(message, tag = "1")]
    Null(NullProto),
    #[prost(bool, tag = "2")]
    Bool(bool),
    #[prost(sint64, tag = "3")]
    Int(i64),
    #[prost(double, tag = "4")]
    Float(f64),
    #[prost(string, tag = "5")]
    Str(String),
    #[prost(bytes = "vec", tag = "6")]
    Bytes(Vec<u8>),
    #[prost(message, tag = "7")]
    Vendor(VendorBytesProto),
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct NullProto {}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct VendorBytesProto {
    #[prost(string, tag = "1")]
    pub obj_type: String,
    #[prost(string, tag = "2")]
    pub vendor_lib: String,
    #[prost(string, tag = "3")]
    pub vendor_lib_version: String,
    #[prost(bytes = "vec", tag = "4")]
    pub content: Vec<u8>,
}
