use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use super::document::{ByteOrder, EncodedArray};
use super::resolver::ColumnValue;

/// Turns an encoded-array descriptor into a flat numeric sequence.
///
/// Implementations must be shareable across threads; the walker dispatches
/// every encoded array of a file at once and joins on the results.
pub trait NumericCodec: Send + Sync {
    fn decode(&self, array: &EncodedArray) -> Result<Vec<f64>>;

    fn name(&self) -> &str;
}

/// Decodes base64 payloads without leaving the process. Byte order comes
/// from the marker's `order` field or a `>` dtype prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessCodec;

impl NumericCodec for InProcessCodec {
    fn decode(&self, array: &EncodedArray) -> Result<Vec<f64>> {
        let bytes = STANDARD
            .decode(array.payload.trim())
            .context("invalid base64 payload")?;
        let order = if array.dtype.starts_with('>') {
            ByteOrder::Big
        } else {
            array.order
        };
        let dtype = array.dtype.trim_start_matches(['<', '>', '=', '|']);

        let values = match dtype {
            "float64" | "f8" => read_elements::<8>(&bytes, order, |raw| f64::from_le_bytes(raw))?,
            "float32" | "f4" => read_elements::<4>(&bytes, order, |raw| f32::from_le_bytes(raw) as f64)?,
            "int64" | "i8" => read_elements::<8>(&bytes, order, |raw| i64::from_le_bytes(raw) as f64)?,
            "int32" | "i4" => read_elements::<4>(&bytes, order, |raw| i32::from_le_bytes(raw) as f64)?,
            "int16" | "i2" => read_elements::<2>(&bytes, order, |raw| i16::from_le_bytes(raw) as f64)?,
            "int8" | "i1" => read_elements::<1>(&bytes, order, |raw| i8::from_le_bytes(raw) as f64)?,
            "uint64" | "u8" => read_elements::<8>(&bytes, order, |raw| u64::from_le_bytes(raw) as f64)?,
            "uint32" | "u4" => read_elements::<4>(&bytes, order, |raw| u32::from_le_bytes(raw) as f64)?,
            "uint16" | "u2" => read_elements::<2>(&bytes, order, |raw| u16::from_le_bytes(raw) as f64)?,
            "uint8" | "u1" => read_elements::<1>(&bytes, order, |raw| raw[0] as f64)?,
            other => bail!("unsupported dtype: {other}"),
        };

        let expected: usize = array.shape.iter().product();
        if !array.shape.is_empty() && expected != values.len() {
            bail!(
                "shape {:?} expects {} elements, payload holds {}",
                array.shape,
                expected,
                values.len()
            );
        }

        Ok(values)
    }

    fn name(&self) -> &str {
        "in-process"
    }
}

/// `convert` always receives little-endian bytes.
fn read_elements<const N: usize>(
    bytes: &[u8],
    order: ByteOrder,
    convert: impl Fn([u8; N]) -> f64,
) -> Result<Vec<f64>> {
    if bytes.len() % N != 0 {
        bail!("payload length {} is not a multiple of {}", bytes.len(), N);
    }

    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0_u8; N];
            raw.copy_from_slice(chunk);
            if order == ByteOrder::Big {
                raw.reverse();
            }
            convert(raw)
        })
        .collect())
}

/// Hands the descriptor to an external decoder over stdin and reads a JSON
/// array back from its stdout.
#[derive(Debug, Clone)]
pub struct SubprocessCodec {
    program: String,
    args: Vec<String>,
}

impl SubprocessCodec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl NumericCodec for SubprocessCodec {
    fn decode(&self, array: &EncodedArray) -> Result<Vec<f64>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute codec {}", self.program))?;

        let request = serde_json::to_vec(array).context("failed to serialize codec request")?;
        {
            let mut stdin = child
                .stdin
                .take()
                .context("codec stdin was not captured")?;
            stdin
                .write_all(&request)
                .and_then(|_| stdin.write_all(b"\n"))
                .with_context(|| format!("failed to write request to codec {}", self.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for codec {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "codec {} returned non-zero exit status: {}",
                self.program,
                stderr.trim()
            );
        }

        let response: Value = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("codec {} returned invalid JSON", self.program))?;

        let mut values = Vec::new();
        flatten_numbers(&response, &mut values)?;
        Ok(values)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

fn flatten_numbers(value: &Value, output: &mut Vec<f64>) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_numbers(item, output)?;
            }
        }
        Value::Number(number) => output.push(number.as_f64().unwrap_or(f64::NAN)),
        Value::Null => output.push(f64::NAN),
        other => bail!("codec returned a non-numeric element: {other}"),
    }
    Ok(())
}

/// Rebuilds row-major nesting for multi-dimensional shapes.
pub fn reshape(values: Vec<f64>, shape: &[usize]) -> ColumnValue {
    let expected: usize = shape.iter().product();
    if shape.len() <= 1 || expected != values.len() || expected == 0 {
        return ColumnValue::Sequence(values.into_iter().map(ColumnValue::Number).collect());
    }

    let row_len = expected / shape[0];
    let rows = values
        .chunks(row_len)
        .map(|row| reshape(row.to_vec(), &shape[1..]))
        .collect();
    ColumnValue::Sequence(rows)
}
