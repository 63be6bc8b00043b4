// File: testing-framework/src/client/contract.rs
//
// Contract toolkit for the HTTP based adapters: Solidity compilation through
// `solc`, and ABI encoding/decoding of calls against the compiled metadata.
//
// Calls are written as `method(arg, ...)` where every argument is a JSON
// literal and `Address(<base58>)` stands for a node address. Node addresses
// are 20 bytes but are carried in 32-byte words, so `address` parameters are
// encoded as `bytes32` while selectors keep the declared signature.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{JsonAbi, Param};
use alloy_primitives::{hex, U256};
use indexmap::IndexMap;
use lk_common::Address;
use serde_json::{Map, Value};

use super::{command::run_command, Timing};
use crate::{
    error::{Result, TestError},
    logger::Logger,
};

pub const CODE_FILE_NAME: &str = "compiled_code.bin";
pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const CONSTRUCTOR: &str = "constructor";

/// Bytecode and metadata of one compiled contract folder
#[derive(Debug, Clone)]
pub struct CompiledContract {
    pub bytecode: String,
    pub metadata: Value,
}

impl CompiledContract {
    pub fn load(folder: &Path) -> Result<Self> {
        let code_path = folder.join(CODE_FILE_NAME);
        if !code_path.exists() {
            return Err(TestError::InvalidArguments(format!(
                "contract file not exists by path: {}",
                code_path.display()
            )));
        }
        let metadata_path = folder.join(METADATA_FILE_NAME);
        if !metadata_path.exists() {
            return Err(TestError::InvalidArguments(format!(
                "contract metadata file not exists by path: {}",
                metadata_path.display()
            )));
        }

        Ok(Self {
            bytecode: fs::read_to_string(code_path)?.trim().to_owned(),
            metadata: serde_json::from_str(&fs::read_to_string(metadata_path)?)?,
        })
    }

    pub fn abi(&self) -> Result<JsonAbi> {
        let abi = self
            .metadata
            .pointer("/output/abi")
            .ok_or_else(|| TestError::InvalidArguments("metadata has no output.abi".to_owned()))?;
        Ok(serde_json::from_value(abi.clone())?)
    }

    /// ABI text as stored in the metadata, sent along with v1 deployments
    pub fn abi_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.abi()?)?)
    }
}

/// Split `solc` output into `contract name -> payload line`
///
/// Each contract is printed as a `======= <file>:<Name> =======` header, a
/// label line (`Binary:` or `Metadata:`) and the payload.
pub fn parse_solc_output(output: &str) -> IndexMap<String, String> {
    let lines: Vec<&str> = output.lines().collect();
    let mut result = IndexMap::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if !(line.starts_with("=======") && line.ends_with("=======")) {
            continue;
        }
        let header = line.trim_matches('=').trim();
        let Some((_, name)) = header.rsplit_once(':') else {
            continue;
        };
        if let Some(payload) = lines.get(i + 2) {
            result.insert(name.trim().to_owned(), payload.trim().to_owned());
        }
    }
    result
}

/// Compile `code` with `solc`, writing `<work_dir>/<Contract>/{compiled_code.bin,metadata.json}`
pub async fn compile_file(
    name: &str,
    solc: &Path,
    work_dir: &Path,
    code: &Path,
    timing: Timing,
    logger: &Logger,
) -> Result<Vec<PathBuf>> {
    let source = fs::canonicalize(code).map_err(|e| {
        TestError::InvalidArguments(format!("source file {}: {}", code.display(), e))
    })?;
    let source_arg = source.as_os_str();

    let binaries = parse_solc_output(
        &run_command(name, solc, [OsStr::new("--bin"), source_arg], work_dir, timing.timeout, logger).await?,
    );
    for (contract, bytecode) in &binaries {
        let folder = work_dir.join(contract);
        fs::create_dir_all(&folder)?;
        fs::write(folder.join(CODE_FILE_NAME), bytecode)?;
    }

    let metadata = parse_solc_output(
        &run_command(name, solc, [OsStr::new("--metadata"), source_arg], work_dir, timing.timeout, logger).await?,
    );
    let mut folders = Vec::with_capacity(metadata.len());
    for (contract, raw) in &metadata {
        let folder = work_dir.join(contract);
        fs::create_dir_all(&folder)?;
        let parsed: Value = serde_json::from_str(raw)?;
        fs::write(folder.join(METADATA_FILE_NAME), serde_json::to_string_pretty(&parsed)?)?;
        folders.push(folder);
    }

    logger.info(format!("{} - compiled {} contract(s) from {}", name, folders.len(), source.display()));
    Ok(folders)
}

/// Parsed `method(args)` call
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub method: String,
    pub args: Vec<Value>,
}

const ADDRESS_FN: &str = "Address(";

pub fn parse_call(call: &str) -> Result<ParsedCall> {
    let call = call.trim();
    let (Some(open), true) = (call.find('('), call.ends_with(')')) else {
        return Err(TestError::InvalidArguments(format!("not a call expression: {}", call)));
    };
    let method = call[..open].trim().to_owned();
    let mut inner = call[open + 1..call.len() - 1].to_owned();

    while let Some(start) = inner.find(ADDRESS_FN) {
        let value_start = start + ADDRESS_FN.len();
        let end = inner[value_start..]
            .find(')')
            .map(|i| i + value_start)
            .ok_or_else(|| TestError::InvalidArguments(format!("unterminated Address( in {}", call)))?;
        let address: Address = inner[value_start..end].trim().parse()?;
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&address.to_bytes()?);
        inner.replace_range(start..=end, &format!("\"0x{}\"", hex::encode(word)));
    }

    let args: Vec<Value> = serde_json::from_str(&format!("[{}]", inner))
        .map_err(|e| TestError::InvalidArguments(format!("bad arguments in {}: {}", call, e)))?;
    Ok(ParsedCall { method, args })
}

fn widen_addresses(ty: DynSolType) -> DynSolType {
    match ty {
        DynSolType::Address => DynSolType::FixedBytes(32),
        DynSolType::Array(inner) => DynSolType::Array(Box::new(widen_addresses(*inner))),
        DynSolType::FixedArray(inner, n) => {
            DynSolType::FixedArray(Box::new(widen_addresses(*inner)), n)
        }
        DynSolType::Tuple(items) => {
            DynSolType::Tuple(items.into_iter().map(widen_addresses).collect())
        }
        other => other,
    }
}

fn resolve_params(params: &[Param], widen: bool) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|param| {
            let ty: DynSolType = param.resolve().map_err(|e| {
                TestError::InvalidArguments(format!("failed to resolve param type '{}': {}", param.ty, e))
            })?;
            Ok(if widen { widen_addresses(ty) } else { ty })
        })
        .collect()
}

fn encode_args(types: &[DynSolType], args: &[Value]) -> Result<Vec<u8>> {
    if types.len() != args.len() {
        return Err(TestError::InvalidArguments(format!(
            "argument count mismatch: signature has {} params, got {} args",
            types.len(),
            args.len()
        )));
    }
    let values = types
        .iter()
        .zip(args)
        .map(|(ty, v)| json_to_dyn_value(ty, v))
        .collect::<Result<Vec<_>>>()?;
    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// Hex encoded call data of `message` (constructor data is prefixed with the bytecode)
pub fn encode_message(contract: &CompiledContract, message: &str) -> Result<String> {
    let call = parse_call(message)?;
    let abi = contract.abi()?;

    if call.method == CONSTRUCTOR {
        let inputs = abi.constructor().map(|c| c.inputs.as_slice()).unwrap_or(&[]);
        let encoded = encode_args(&resolve_params(inputs, true)?, &call.args)?;
        return Ok(format!("{}{}", contract.bytecode, hex::encode(encoded)));
    }

    let function = abi
        .function(&call.method)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| TestError::InvalidArguments(format!("no method {} in contract abi", call.method)))?;
    let encoded = encode_args(&resolve_params(&function.inputs, true)?, &call.args)?;
    Ok(format!("{}{}", hex::encode(function.selector()), hex::encode(encoded)))
}

/// Decode the hex encoded output of `method` into a JSON object keyed by output name
pub fn decode_message(contract: &CompiledContract, method: &str, data: &str) -> Result<Value> {
    let abi = contract.abi()?;
    let function = abi
        .function(method)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| TestError::InvalidArguments(format!("no method {} in contract abi", method)))?;

    let bytes = hex::decode(data.trim())
        .map_err(|e| TestError::InvalidArguments(format!("output is not hex: {}", e)))?;
    let types = resolve_params(&function.outputs, false)?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(&bytes)
        .map_err(|e| TestError::BadResult(format!("bad encoding of {} output: {}", method, e)))?;

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    let mut object = Map::new();
    for (i, (param, value)) in function.outputs.iter().zip(values.iter()).enumerate() {
        let key = if param.name.is_empty() {
            i.to_string()
        } else {
            param.name.clone()
        };
        object.insert(key, dyn_to_json(value));
    }
    Ok(Value::Object(object))
}

/// Convert a JSON value to a [`DynSolValue`], building compound types directly
/// and coercing scalar leaves from their string form
fn json_to_dyn_value(ty: &DynSolType, v: &Value) -> Result<DynSolValue> {
    let invalid = |what: String| TestError::InvalidArguments(what);
    match ty {
        DynSolType::Tuple(elems) => {
            let arr = v
                .as_array()
                .ok_or_else(|| invalid(format!("expected array for tuple, got {}", v)))?;
            if arr.len() != elems.len() {
                return Err(invalid(format!(
                    "tuple requires {} elements, got {}",
                    elems.len(),
                    arr.len()
                )));
            }
            let inner = elems
                .iter()
                .zip(arr)
                .map(|(t, vv)| json_to_dyn_value(t, vv))
                .collect::<Result<_>>()?;
            Ok(DynSolValue::Tuple(inner))
        }
        DynSolType::Array(inner) => {
            let arr = v
                .as_array()
                .ok_or_else(|| invalid(format!("expected array, got {}", v)))?;
            let values = arr
                .iter()
                .map(|vv| json_to_dyn_value(inner, vv))
                .collect::<Result<_>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, n) => {
            let arr = v
                .as_array()
                .ok_or_else(|| invalid(format!("expected array, got {}", v)))?;
            if arr.len() != *n {
                return Err(invalid(format!(
                    "fixed array requires {} elements, got {}",
                    n,
                    arr.len()
                )));
            }
            let values = arr
                .iter()
                .map(|vv| json_to_dyn_value(inner, vv))
                .collect::<Result<_>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::String => v
            .as_str()
            .map(|s| DynSolValue::String(s.to_owned()))
            .ok_or_else(|| invalid(format!("expected string, got {}", v))),
        _ => {
            let s = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(invalid(format!("unsupported JSON value for type {}: {}", ty, v))),
            };
            ty.coerce_str(&s)
                .map_err(|e| invalid(format!("failed to coerce '{}' as {}: {}", s, ty, e)))
        }
    }
}

fn dyn_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Uint(u, _) => {
            if *u <= U256::from(u64::MAX) {
                Value::from(u.to::<u64>())
            } else {
                Value::String(u.to_string())
            }
        }
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => Value::String(hex::encode(bytes)),
        DynSolValue::Address(address) => Value::String(hex::encode(address)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(dyn_to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}
