use indexmap::IndexMap;
use prost::Message;
use remex_domain::{Address, ObjectId, ObjectReference};

use super::proto::{
    ActionEnvelope, AddressProto, EnvelopeBody, KwargProto, MethodActionProto,
    PropertyActionProto,
};
use super::{decode_id, DecodeError};
use crate::core::action::{Action, MethodAction, PropertyAction, PropertyKind};

#[must_use]
pub fn encode_action(action: &Action) -> Vec<u8> {
    let body = match action {
        Action::Property(action) => EnvelopeBody::Property(PropertyActionProto {
            path: action.path().to_string(),
            target: action.target().id_at_location.to_vec(),
            result_id: action.result_id().to_vec(),
            address: Some(address_to_proto(action.address())),
            args: references_to_proto(action.args()),
            kwargs: kwargs_to_proto(action.kwargs()),
            kind: action.kind().tag(),
            set_value: action.set_value().map(|value| value.id_at_location.to_vec()),
            message_id: action.message_id().to_vec(),
        }),
        Action::Method(action) => EnvelopeBody::Method(MethodActionProto {
            path: action.path().to_string(),
            target: action.target().id_at_location.to_vec(),
            result_id: action.result_id().to_vec(),
            address: Some(address_to_proto(action.address())),
            args: references_to_proto(action.args()),
            kwargs: kwargs_to_proto(action.kwargs()),
            message_id: action.message_id().to_vec(),
        }),
    };
    ActionEnvelope { action: Some(body) }.encode_to_vec()
}

pub fn decode_action(bytes: &[u8]) -> Result<Action, DecodeError> {
    let envelope = ActionEnvelope::decode(bytes)?;
    match envelope.action.ok_or(DecodeError::MissingField("action"))? {
        EnvelopeBody::Property(proto) => decode_property(proto).map(Action::Property),
        EnvelopeBody::Method(proto) => decode_method(proto).map(Action::Method),
    }
}

fn decode_property(proto: PropertyActionProto) -> Result<PropertyAction, DecodeError> {
    let kind = PropertyKind::from_tag(proto.kind).ok_or(DecodeError::UnknownKind(proto.kind))?;
    let address = decode_address(proto.address)?;
    let target = decode_id("target", &proto.target)?;
    let result_id = decode_id("result_id", &proto.result_id)?;
    let message_id = decode_id("message_id", &proto.message_id)?;
    let args = decode_references(&proto.args)?;
    let mut action = PropertyAction::new(proto.path, target, result_id, kind)
        .with_address(address)
        .with_args(args)
        .with_message_id(message_id);
    for (name, id) in decode_kwargs(proto.kwargs)? {
        action = action.with_kwarg(name, id);
    }
    if let Some(set_value) = proto.set_value {
        action = action.with_set_value(decode_id("set_value", &set_value)?);
    }
    Ok(action)
}

fn decode_method(proto: MethodActionProto) -> Result<MethodAction, DecodeError> {
    let address = decode_address(proto.address)?;
    let target = decode_id("target", &proto.target)?;
    let result_id = decode_id("result_id", &proto.result_id)?;
    let message_id = decode_id("message_id", &proto.message_id)?;
    let args = decode_references(&proto.args)?;
    let mut action = MethodAction::new(proto.path, target, result_id)
        .with_address(address)
        .with_args(args)
        .with_message_id(message_id);
    for (name, id) in decode_kwargs(proto.kwargs)? {
        action = action.with_kwarg(name, id);
    }
    Ok(action)
}

fn references_to_proto(references: &[ObjectReference]) -> Vec<Vec<u8>> {
    references
        .iter()
        .map(|reference| reference.id_at_location.to_vec())
        .collect()
}

fn kwargs_to_proto(kwargs: &IndexMap<String, ObjectReference>) -> Vec<KwargProto> {
    kwargs
        .iter()
        .map(|(name, reference)| KwargProto {
            name: name.clone(),
            id: reference.id_at_location.to_vec(),
        })
        .collect()
}

fn decode_references(raw: &[Vec<u8>]) -> Result<Vec<ObjectReference>, DecodeError> {
    raw.iter()
        .map(|bytes| decode_id("args", bytes).map(ObjectReference::new))
        .collect()
}

fn decode_kwargs(raw: Vec<KwargProto>) -> Result<IndexMap<String, ObjectId>, DecodeError> {
    let mut kwargs = IndexMap::with_capacity(raw.len());
    for kwarg in raw {
        let id = decode_id("kwargs", &kwarg.id)?;
        if kwargs.contains_key(&kwarg.name) {
            return Err(DecodeError::DuplicateKwarg(kwarg.name));
        }
        kwargs.insert(kwarg.name, id);
    }
    Ok(kwargs)
}

fn address_to_proto(address: &Address) -> AddressProto {
    AddressProto {
        name: address.name.clone(),
        network: address.network.map(|id| id.to_vec()),
        domain: address.domain.map(|id| id.to_vec()),
        device: address.device.map(|id| id.to_vec()),
        vm: address.vm.map(|id| id.to_vec()),
    }
}

fn decode_address(proto: Option<AddressProto>) -> Result<Address, DecodeError> {
    let proto = proto.ok_or(DecodeError::MissingField("address"))?;
    let route = |field, raw: Option<Vec<u8>>| raw.map(|bytes| decode_id(field, &bytes)).transpose();
    Ok(Address {
        name: proto.name,
        network: route("address.network", proto.network)?,
        domain: route("address.domain", proto.domain)?,
        device: route("address.device", proto.device)?,
        vm: route("address.vm", proto.vm)?,
    })
}
