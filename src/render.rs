// SPDX: CC0-1.0

use crate::{
    plot::{Anchor, Baseline, Color, Scene, POINT_SIZE, TICK_SIZE},
    Number,
};
use std::io::{self, Write};

const AXIS_COLOR: Color = Color::BLACK;
const BACKGROUND: Color = Color::rgb(0xd3, 0xd3, 0xd3);
const FONT_SIZE: Number = 12.0;

/// Writes `scene` as a standalone SVG document.
pub fn write_svg<W: Write>(mut out: W, scene: &Scene) -> io::Result<()> {
    let (width, height) = (scene.canvas.width, scene.canvas.height);
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    writeln!(out, r#"<rect width="100%" height="100%" fill="{BACKGROUND}"/>"#)?;

    // axes
    for line in [&scene.x_axis, &scene.y_axis] {
        writeln!(
            out,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{AXIS_COLOR}"/>"#,
            line.from.x, line.from.y, line.to.x, line.to.y
        )?;
    }
    for tick in scene.x_ticks.iter().chain(&scene.y_ticks) {
        writeln!(
            out,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{AXIS_COLOR}"/>"#,
            tick.x,
            tick.y,
            TICK_SIZE / 2.0
        )?;
    }

    // curves
    for path in &scene.curves {
        writeln!(out, r#"<g stroke="{color}" fill="{color}">"#, color = path.color)?;
        for point in &path.points {
            writeln!(
                out,
                r#"  <rect x="{}" y="{}" width="{POINT_SIZE}" height="{POINT_SIZE}"/>"#,
                point.x - POINT_SIZE / 2.0,
                point.y - POINT_SIZE / 2.0
            )?;
        }
        for (from, to) in path.segments() {
            writeln!(
                out,
                r#"  <line x1="{}" y1="{}" x2="{}" y2="{}"/>"#,
                from.x, from.y, to.x, to.y
            )?;
        }
        writeln!(out, "</g>")?;
    }

    for label in &scene.labels {
        let anchor = match label.anchor {
            Anchor::Start => "start",
            Anchor::End => "end",
        };
        let baseline = match label.baseline {
            Baseline::Above => "auto",
            Baseline::Below => "hanging",
        };
        writeln!(
            out,
            r#"<text x="{}" y="{}" font-size="{FONT_SIZE}" text-anchor="{anchor}" dominant-baseline="{baseline}">{}</text>"#,
            label.at.x, label.at.y, label.text
        )?;
    }

    writeln!(out, "</svg>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{self, Canvas, Curve, CurveSet, PlotConfig, PALETTE};
    use std::sync::Arc;

    #[test]
    fn writes_every_element() {
        let mut curves = CurveSet::new();
        let curve = Curve::new(Arc::from([1.0, 0.0, -1.0].as_slice()), vec![1.0, 0.0, 1.0]).unwrap();
        curves.insert(0, curve).unwrap();
        let scene = plot::map(&PlotConfig::default(), &curves, Canvas::default()).unwrap();

        let mut buf = Vec::new();
        write_svg(&mut buf, &scene).unwrap();
        let svg = String::from_utf8(buf).unwrap();

        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(&format!(r#"stroke="{}""#, PALETTE[0])));
        assert_eq!(svg.matches("<text ").count(), 4);
        assert!(svg.contains(">-5.0</text>"));
        // 2 axes and 2 segments
        assert_eq!(svg.matches("<line ").count(), 4);
        assert_eq!(svg.matches("<circle ").count(), 22);
    }

    #[test]
    fn color_is_hex() {
        assert_eq!(PALETTE[7].to_string(), "#ffc800");
    }
}
