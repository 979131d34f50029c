use alloy::{
    dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
    hex,
    json_abi::{Function, JsonAbi},
    primitives::{Bytes, Selector},
};
use anyhow::{Context, Result, bail};

use crate::{
    error::{StatusCode, StubError},
    proxy::FunctionCall,
};

/// A parsed contract ABI with lookup by name/arity and by selector.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    abi: JsonAbi,
}

impl ContractAbi {
    pub fn parse(json: &str) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(json).context("invalid contract ABI JSON")?;
        Ok(Self { abi })
    }

    /// First overload of `method` taking exactly `arg_count` inputs.
    pub fn resolve(&self, method: &str, arg_count: usize) -> Result<&Function, StubError> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arg_count))
            .ok_or_else(|| {
                StubError::new(StatusCode::MethodNotExist, format!("method not exist: {method}"))
            })
    }

    pub fn function_by_selector(&self, selector: Selector) -> Option<&Function> {
        self.abi.functions().find(|f| f.selector() == selector)
    }
}

/// Packs string arguments per the function's input types, without selector.
pub fn encode_args(function: &Function, args: &[String]) -> Result<Bytes> {
    let values = parse_args(function, args)?;
    Ok(function.abi_encode_input_raw(&values)?.into())
}

/// Selector followed by the packed arguments.
pub fn encode_call(function: &Function, args: &[String]) -> Result<FunctionCall> {
    let values = parse_args(function, args)?;
    Ok(FunctionCall {
        selector: function.selector(),
        calldata: function.abi_encode_input(&values)?.into(),
    })
}

/// Decodes packed input arguments (no selector) into their string forms.
pub fn decode_args(function: &Function, data: &[u8]) -> Result<Vec<String>> {
    let values = function
        .abi_decode_input(data)
        .with_context(|| format!("failed to decode input of {}", function.signature()))?;
    Ok(values.iter().map(format_value).collect())
}

/// Decodes packed return data into their string forms.
pub fn decode_result(function: &Function, data: &[u8]) -> Result<Vec<String>> {
    let values = function
        .abi_decode_output(data)
        .with_context(|| format!("failed to decode output of {}", function.signature()))?;
    Ok(values.iter().map(format_value).collect())
}

fn parse_args(function: &Function, args: &[String]) -> Result<Vec<DynSolValue>> {
    if function.inputs.len() != args.len() {
        bail!(
            "{} takes {} arguments, got {}",
            function.signature(),
            function.inputs.len(),
            args.len()
        );
    }
    function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, raw)| {
            let ty = param
                .resolve()
                .with_context(|| format!("unresolvable parameter type {}", param.ty))?;
            parse_value(&ty, raw).with_context(|| format!("bad {} argument {raw:?}", param.ty))
        })
        .collect()
}

fn parse_value(ty: &DynSolType, raw: &str) -> Result<DynSolValue> {
    match ty {
        // Strings are taken verbatim, the coercion grammar would want quotes.
        DynSolType::String => Ok(DynSolValue::String(raw.to_string())),
        DynSolType::Bytes => Ok(DynSolValue::Bytes(hex::decode(raw)?)),
        DynSolType::Bool
        | DynSolType::Int(_)
        | DynSolType::Uint(_)
        | DynSolType::Address
        | DynSolType::FixedBytes(_)
        | DynSolType::Function
        | DynSolType::Array(_)
        | DynSolType::FixedArray(..)
        | DynSolType::Tuple(_) => Ok(ty.coerce_str(raw)?),
        #[allow(unreachable_patterns)]
        other => bail!("unsupported parameter type {other}"),
    }
}

pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(a) => hex::encode_prefixed(a),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Function(f) => hex::encode_prefixed(f),
        DynSolValue::Bytes(b) => hex::encode_prefixed(b),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            format!(
                "[{}]",
                items.iter().map(format_value).collect::<Vec<_>>().join(",")
            )
        }
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proxy::selector_of;
    use alloy::{
        primitives::{Address, U256},
        sol_types::SolValue,
    };

    pub(crate) const TOKEN_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"set","stateMutability":"nonpayable",
         "inputs":[{"name":"value","type":"string"}],
         "outputs":[]},
        {"type":"function","name":"set","stateMutability":"nonpayable",
         "inputs":[{"name":"key","type":"string"},{"name":"value","type":"string"}],
         "outputs":[]},
        {"type":"function","name":"get","stateMutability":"view",
         "inputs":[],
         "outputs":[{"name":"","type":"string"}]}
    ]"#;

    pub(crate) const RECIPIENT: &str = "0xabcabcabcabcabcabcabcabcabcabcabcabcabca";

    #[test]
    fn test_resolve_by_arity() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        assert_eq!(abi.resolve("set", 1).unwrap().signature(), "set(string)");
        assert_eq!(abi.resolve("set", 2).unwrap().signature(), "set(string,string)");

        let err = abi.resolve("set", 3).unwrap_err();
        assert_eq!(err.code, StatusCode::MethodNotExist.code());
        let err = abi.resolve("mint", 0).unwrap_err();
        assert_eq!(err.code, StatusCode::MethodNotExist.code());
    }

    #[test]
    fn test_encode_transfer_args() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let transfer = abi.resolve("transfer", 2).unwrap();
        let args = vec![RECIPIENT.to_string(), "100".to_string()];

        let encoded = encode_args(transfer, &args).unwrap();
        let expected = (RECIPIENT.parse::<Address>().unwrap(), U256::from(100)).abi_encode_params();
        assert_eq!(encoded.as_ref(), expected.as_slice());

        let call = encode_call(transfer, &args).unwrap();
        assert_eq!(call.selector, selector_of("transfer(address,uint256)"));
        assert_eq!(&call.calldata[4..], expected.as_slice());

        assert_eq!(decode_args(transfer, &encoded).unwrap(), args);
    }

    #[test]
    fn test_string_args_are_verbatim() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let set = abi.resolve("set", 1).unwrap();
        let args = vec!["hello world".to_string()];
        let encoded = encode_args(set, &args).unwrap();
        assert_eq!(decode_args(set, &encoded).unwrap(), args);
    }

    #[test]
    fn test_decode_result() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let transfer = abi.resolve("transfer", 2).unwrap();
        let output = true.abi_encode();
        assert_eq!(decode_result(transfer, &output).unwrap(), vec!["true"]);

        let get = abi.resolve("get", 0).unwrap();
        let output = ("hi".to_string(),).abi_encode_params();
        assert_eq!(decode_result(get, &output).unwrap(), vec!["hi"]);
    }

    #[test]
    fn test_bad_argument_is_an_error() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let transfer = abi.resolve("transfer", 2).unwrap();
        let args = vec!["not-an-address".to_string(), "100".to_string()];
        assert!(encode_args(transfer, &args).is_err());
    }

    #[test]
    fn test_function_by_selector() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let found = abi
            .function_by_selector(selector_of("balanceOf(address)"))
            .unwrap();
        assert_eq!(found.name, "balanceOf");
        assert!(abi.function_by_selector(Selector::ZERO).is_none());
    }
}
