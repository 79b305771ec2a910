// ============================================================
// Layer 5 — Model Summary
// ============================================================
// A printable layer table: name, output shape and parameter
// count per layer, followed by the total.
//
//   Model: "sequential"
//   ─────────────────────────────────────────────────────────
//   Layer (type)              Output Shape           Param #
//   ═════════════════════════════════════════════════════════
//   conv2d (Conv2D)           (None, 30, 30, 32)         896
//   ...
//   Total params: 122,570
//
// Rows hold shapes in burn's [C, H, W] order. They are printed
// channels-last with the batch dimension as None.

use std::fmt;

/// Spatial size after a convolution or pooling window.
pub fn conv_output(size: usize, kernel: usize, stride: usize, padding: usize) -> usize {
    (size + 2 * padding).saturating_sub(kernel) / stride + 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRow {
    pub name:         String,
    pub output_shape: Vec<usize>,
    pub params:       usize,
}

#[derive(Debug, Clone)]
pub struct ModelSummary {
    title: String,
    rows:  Vec<LayerRow>,
}

impl ModelSummary {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), rows: Vec::new() }
    }

    pub fn layer(mut self, name: impl Into<String>, output_shape: &[usize], params: usize) -> Self {
        self.rows.push(LayerRow {
            name: name.into(),
            output_shape: output_shape.to_vec(),
            params,
        });
        self
    }

    pub fn rows(&self) -> &[LayerRow] {
        &self.rows
    }

    pub fn total_params(&self) -> usize {
        self.rows().iter().map(|r| r.params).sum()
    }
}

/// [C, H, W] → "(None, H, W, C)"; flat shapes print as they are.
fn shape_label(shape: &[usize]) -> String {
    let dims: Vec<String> = match shape {
        [c, h, w] => [h, w, c].iter().map(|d| d.to_string()).collect(),
        _ => shape.iter().map(|d| d.to_string()).collect(),
    };
    format!("(None, {})", dims.join(", "))
}

/// 122570 → "122,570"
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: usize = 65;
        writeln!(f, "Model: \"{}\"", self.title)?;
        writeln!(f, "{}", "─".repeat(WIDTH))?;
        writeln!(f, "{:<30}{:<24}{:>11}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{}", "═".repeat(WIDTH))?;
        for row in self.rows() {
            writeln!(
                f,
                "{:<30}{:<24}{:>11}",
                row.name,
                shape_label(&row.output_shape),
                group_thousands(row.params)
            )?;
        }
        writeln!(f, "{}", "═".repeat(WIDTH))?;
        write!(f, "Total params: {}", group_thousands(self.total_params()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_output() {
        assert_eq!(conv_output(32, 3, 1, 0), 30);
        assert_eq!(conv_output(30, 2, 2, 0), 15);
        assert_eq!(conv_output(224, 7, 2, 3), 112);
        assert_eq!(conv_output(112, 3, 2, 1), 56);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(650), "650");
        assert_eq!(group_thousands(1024), "1,024");
        assert_eq!(group_thousands(122570), "122,570");
        assert_eq!(group_thousands(23587712), "23,587,712");
    }

    #[test]
    fn test_shape_label_is_channels_last() {
        assert_eq!(shape_label(&[32, 30, 30]), "(None, 30, 30, 32)");
        assert_eq!(shape_label(&[3, 64, 48]), "(None, 64, 48, 3)");
        assert_eq!(shape_label(&[2304]), "(None, 2304)");
    }

    #[test]
    fn test_render_table() {
        let summary = ModelSummary::new("tiny")
            .layer("conv2d (Conv2D)", &[32, 30, 30], 0)
            .layer("dense (Dense)", &[64], 65600)
            .layer("dense_1 (Dense)", &[10], 650);

        assert_eq!(summary.total_params(), 66250);
        let text = summary.to_string();
        assert!(text.starts_with("Model: \"tiny\""));
        assert!(text.contains("(None, 30, 30, 32)"));
        assert!(text.contains("(None, 64)"));
        assert!(text.contains("65,600"));
        assert!(text.ends_with("Total params: 66,250"));
    }
}
