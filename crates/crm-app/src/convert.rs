// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{FieldValue, Record, decode_with_report, encode};
use crate::model::{Client, ContactPerson, Deal, Project, Task};
use crate::schema::RecordKind;

/// Entities that map onto one exchange file.
pub trait Exchange: Serialize + DeserializeOwned {
    const KIND: RecordKind;
}

impl Exchange for Client {
    const KIND: RecordKind = RecordKind::Clients;
}

impl Exchange for ContactPerson {
    const KIND: RecordKind = RecordKind::ContactPersons;
}

impl Exchange for Project {
    const KIND: RecordKind = RecordKind::Projects;
}

impl Exchange for Deal {
    const KIND: RecordKind = RecordKind::Deals;
}

impl Exchange for Task {
    const KIND: RecordKind = RecordKind::Tasks;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntities<T> {
    pub entities: Vec<T>,
    pub skipped_lines: Vec<usize>,
}

pub fn to_record<T: Serialize>(entity: &T) -> Result<Record> {
    let value = serde_json::to_value(entity).context("serialize entity")?;
    let Value::Object(map) = value else {
        bail!("entity did not serialize to an object");
    };

    Ok(map
        .into_iter()
        .filter_map(|(key, value)| json_to_field(value).map(|field| (key, field)))
        .collect())
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    let map = record
        .into_iter()
        .map(|(key, value)| (key, field_to_json(value)))
        .collect();
    serde_path_to_error::deserialize(Value::Object(map)).map_err(|error| {
        let field = error.path().to_string();
        let source = anyhow::Error::new(error.into_inner());
        if field == "." {
            source.context("decode record")
        } else {
            source.context(format!("field `{field}`"))
        }
    })
}

pub fn encode_entities<T: Exchange>(entities: &[T]) -> Result<String> {
    let records = entities
        .iter()
        .map(to_record)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("prepare {} for export", T::KIND.as_str()))?;
    Ok(encode(&records, T::KIND.fields()))
}

pub fn decode_entities<T: Exchange>(text: &str) -> Result<DecodedEntities<T>> {
    let decoded = decode_with_report(text, &T::KIND.field_types());
    let entities = decoded
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            from_record(record)
                .with_context(|| format!("{} row {}", T::KIND.as_str(), index + 1))
        })
        .collect::<Result<Vec<T>>>()?;
    Ok(DecodedEntities {
        entities,
        skipped_lines: decoded.skipped_lines,
    })
}

fn json_to_field(value: Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(FieldValue::Text(text)),
        Value::Number(number) => Some(
            number
                .as_f64()
                .map_or_else(|| FieldValue::Text(number.to_string()), FieldValue::Number),
        ),
        Value::Bool(flag) => Some(FieldValue::Text(flag.to_string())),
        Value::Array(items) => Some(FieldValue::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect(),
        )),
        other @ Value::Object(_) => Some(FieldValue::Text(other.to_string())),
    }
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text),
        FieldValue::Number(number) => {
            serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
        }
        FieldValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
    }
}
