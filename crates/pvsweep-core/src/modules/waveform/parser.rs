use super::WaveformError;
use super::model::{Variable, Waveform};

const AXISLESS_PLOTS: [&str; 2] = ["Operating Point", "Transfer Function"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataSection {
    Binary,
    Values,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    F32,
    F64,
}

impl Sample {
    const fn width(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Debug, Default)]
struct Header {
    title: String,
    date: String,
    plotname: String,
    flags: Vec<String>,
    variable_count: Option<usize>,
    point_count: Option<usize>,
    variables: Vec<Variable>,
}

/// Line reader over a header that is either UTF-16LE or single-byte text.
struct HeaderReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    wide: bool,
}

impl<'a> HeaderReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xFE]) {
            return Self {
                bytes,
                offset: 2,
                wide: true,
            };
        }
        let wide = bytes.len() >= 2 && bytes[0] != 0 && bytes[1] == 0;
        Self {
            bytes,
            offset: 0,
            wide,
        }
    }

    fn next_line(&mut self) -> Option<String> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let mut units = Vec::new();
        let mut narrow = Vec::new();
        loop {
            if self.wide {
                let pair = self.bytes.get(self.offset..self.offset + 2)?;
                self.offset += 2;
                let unit = u16::from_le_bytes([pair[0], pair[1]]);
                if unit == u16::from(b'\n') {
                    break;
                }
                units.push(unit);
            } else {
                let byte = *self.bytes.get(self.offset)?;
                self.offset += 1;
                if byte == b'\n' {
                    break;
                }
                narrow.push(byte);
            }
        }
        let line = if self.wide {
            String::from_utf16_lossy(&units)
        } else {
            String::from_utf8_lossy(&narrow).into_owned()
        };
        Some(line.trim_end_matches('\r').to_string())
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.offset.min(self.bytes.len())..]
    }
}

pub(super) fn parse_waveform(bytes: &[u8]) -> Result<Waveform, WaveformError> {
    let mut reader = HeaderReader::new(bytes);
    let (header, section) = parse_header(&mut reader)?;

    if header.flags.iter().any(|flag| flag.eq_ignore_ascii_case("complex")) {
        return Err(structural("complex waveform data is not supported"));
    }

    let variable_count = header
        .variable_count
        .ok_or_else(|| structural("header is missing 'No. Variables'"))?;
    let point_count = header
        .point_count
        .ok_or_else(|| structural("header is missing 'No. Points'"))?;
    if header.variables.len() != variable_count {
        return Err(structural(format!(
            "variable table lists {} entries but header declares {}",
            header.variables.len(),
            variable_count
        )));
    }
    if variable_count == 0 {
        return Err(structural("waveform declares no variables"));
    }

    let traces = match section {
        DataSection::Binary => parse_binary(&header, reader.remaining(), point_count)?,
        DataSection::Values => {
            let text = if reader.wide {
                decode_utf16(reader.remaining())
            } else {
                String::from_utf8_lossy(reader.remaining()).into_owned()
            };
            parse_values(&text, variable_count, point_count)?
        }
    };

    Ok(Waveform {
        title: header.title,
        date: header.date,
        plotname: header.plotname,
        flags: header.flags,
        variables: header.variables,
        traces,
    })
}

fn parse_header(reader: &mut HeaderReader<'_>) -> Result<(Header, DataSection), WaveformError> {
    let mut header = Header::default();

    while let Some(line) = reader.next_line() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("Binary:") {
            return Ok((header, DataSection::Binary));
        }
        if trimmed.eq_ignore_ascii_case("Values:") {
            return Ok((header, DataSection::Values));
        }
        if trimmed.eq_ignore_ascii_case("Variables:") {
            let count = header
                .variable_count
                .ok_or_else(|| structural("'Variables:' appears before 'No. Variables'"))?;
            header.variables = parse_variable_table(reader, count)?;
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            return Err(structural(format!("unexpected header line '{}'", trimmed)));
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => header.title = value.to_string(),
            "date" => header.date = value.to_string(),
            "plotname" => header.plotname = value.to_string(),
            "flags" => {
                header.flags = value.split_whitespace().map(str::to_string).collect();
            }
            "no. variables" => header.variable_count = Some(parse_count(key, value)?),
            "no. points" => header.point_count = Some(parse_count(key, value)?),
            _ => {}
        }
    }

    Err(structural("header ends without a 'Binary:' or 'Values:' section"))
}

fn parse_variable_table(
    reader: &mut HeaderReader<'_>,
    count: usize,
) -> Result<Vec<Variable>, WaveformError> {
    let mut variables = Vec::new();
    while variables.len() < count {
        let line = reader
            .next_line()
            .ok_or_else(|| structural("variable table is truncated"))?;
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.is_empty() {
            continue;
        }
        let [index, name, kind, ..] = fields.as_slice() else {
            return Err(structural(format!("malformed variable entry '{}'", line.trim())));
        };
        let index = index
            .parse::<usize>()
            .map_err(|_| structural(format!("malformed variable index in '{}'", line.trim())))?;
        variables.push(Variable {
            index,
            name: (*name).to_string(),
            kind: (*kind).to_string(),
        });
    }
    Ok(variables)
}

fn parse_count(key: &str, value: &str) -> Result<usize, WaveformError> {
    value
        .parse::<usize>()
        .map_err(|_| structural(format!("'{}' is not a count: '{}'", key.trim(), value)))
}

fn sample_layout(header: &Header) -> Vec<Sample> {
    let has_flag = |flag: &str| header.flags.iter().any(|value| value.eq_ignore_ascii_case(flag));
    let count = header.variables.len();
    if has_flag("double") {
        return vec![Sample::F64; count];
    }
    let mut layout = vec![Sample::F32; count];
    let has_axis = !AXISLESS_PLOTS
        .iter()
        .any(|plot| header.plotname.eq_ignore_ascii_case(plot));
    if has_axis {
        layout[0] = Sample::F64;
    }
    layout
}

fn parse_binary(
    header: &Header,
    data: &[u8],
    point_count: usize,
) -> Result<Vec<Vec<f64>>, WaveformError> {
    let layout = sample_layout(header);
    let row_width = layout.iter().map(|sample| sample.width()).sum::<usize>();
    if row_width.checked_mul(point_count) != Some(data.len()) {
        return Err(structural(format!(
            "binary section holds {} bytes but {} points of {} bytes were declared",
            data.len(),
            point_count,
            row_width
        )));
    }

    let fast_access = header
        .flags
        .iter()
        .any(|flag| flag.eq_ignore_ascii_case("fastaccess"));
    let mut traces = vec![Vec::with_capacity(point_count); layout.len()];
    let mut offset = 0;

    if fast_access {
        for (variable, sample) in layout.iter().enumerate() {
            for _ in 0..point_count {
                traces[variable].push(read_sample(data, offset, *sample)?);
                offset += sample.width();
            }
        }
    } else {
        for _ in 0..point_count {
            for (variable, sample) in layout.iter().enumerate() {
                traces[variable].push(read_sample(data, offset, *sample)?);
                offset += sample.width();
            }
        }
    }
    Ok(traces)
}

fn read_sample(data: &[u8], offset: usize, sample: Sample) -> Result<f64, WaveformError> {
    let value = match sample {
        Sample::F32 => read_f32_le(data, offset).map(f64::from),
        Sample::F64 => read_f64_le(data, offset),
    };
    value.ok_or_else(|| structural(format!("binary section truncated at byte {}", offset)))
}

fn read_f32_le(bytes: &[u8], offset: usize) -> Option<f32> {
    let slice = bytes.get(offset..offset + 4)?;
    let mut value = [0_u8; 4];
    value.copy_from_slice(slice);
    Some(f32::from_le_bytes(value))
}

fn read_f64_le(bytes: &[u8], offset: usize) -> Option<f64> {
    let slice = bytes.get(offset..offset + 8)?;
    let mut value = [0_u8; 8];
    value.copy_from_slice(slice);
    Some(f64::from_le_bytes(value))
}

fn decode_utf16(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    String::from_utf16_lossy(&units)
}

fn parse_values(
    text: &str,
    variable_count: usize,
    point_count: usize,
) -> Result<Vec<Vec<f64>>, WaveformError> {
    // Each point needs an index token plus one token per variable.
    let available = text.split_whitespace().count() / (variable_count + 1);
    if point_count > available {
        return Err(structural(format!(
            "values section holds {} complete points but {} were declared",
            available, point_count
        )));
    }

    let mut tokens = text.split_whitespace();
    let mut traces = vec![Vec::with_capacity(point_count); variable_count];

    for point in 0..point_count {
        let index = tokens
            .next()
            .ok_or_else(|| structural(format!("values section ends before point {}", point)))?;
        if index.parse::<usize>().ok() != Some(point) {
            return Err(structural(format!(
                "expected point index {}, found '{}'",
                point, index
            )));
        }
        for trace in traces.iter_mut() {
            let token = tokens.next().ok_or_else(|| {
                structural(format!("point {} is missing values", point))
            })?;
            let value = token.parse::<f64>().map_err(|_| {
                structural(format!("point {} has a non-numeric value '{}'", point, token))
            })?;
            trace.push(value);
        }
    }

    if let Some(extra) = tokens.next() {
        return Err(structural(format!(
            "values section has data past {} points, starting at '{}'",
            point_count, extra
        )));
    }
    Ok(traces)
}

fn structural(message: impl Into<String>) -> WaveformError {
    WaveformError::Structural(message.into())
}
