use crate::common::*;
use regex::Regex;

static METRIC_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^IoU metric: (\w+)").unwrap());
static AP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Average Precision\s+\(AP\) @\[ IoU=0\.50:0\.95[^\]]*\] = (-?\d+\.\d+)").unwrap()
});

/// Extracted average-precision metrics, keyed by task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApValues {
    pub bbox_ap: Option<f64>,
    pub mask_ap: Option<f64>,
}

/// Captures the evaluator's textual summary in place of the standard
/// output stream.
#[derive(Debug, Default)]
pub struct SummaryBuffer {
    buffer: String,
}

impl SummaryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured summary text.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Extract the primary AP value of every task section.
    pub fn ap_values(&self) -> Result<ApValues> {
        let mut values = ApValues {
            bbox_ap: None,
            mask_ap: None,
        };

        let mut section: Option<String> = None;
        for line in self.buffer.lines() {
            if let Some(captures) = METRIC_HEADER.captures(line) {
                section = Some(captures[1].to_owned());
            } else if let Some(captures) = AP_LINE.captures(line) {
                let value: f64 = captures[1].parse()?;
                match section.as_deref() {
                    Some("bbox") => values.bbox_ap = Some(value),
                    Some("segm") => values.mask_ap = Some(value),
                    Some(other) => bail!("unknown metric section '{}'", other),
                    None => bail!("AP line outside of a metric section"),
                }
            }
        }

        Ok(values)
    }
}

impl io::Write for SummaryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.buffer.push_str(text);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
