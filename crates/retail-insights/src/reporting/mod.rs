//! Result export and report rendering.
//!
//! [`ReportExporter`] writes the KPI tables and `report.qmd` into a report
//! directory; [`ReportRenderer`] turns that document into HTML with an
//! external program. Render failures never invalidate the exported files.

mod exporter;
mod renderer;
mod template;

pub use exporter::{GLOBAL_KPIS_FILE, REPORT_DOCUMENT, RESULT_FILES, RESULTS_DIR, ReportExporter};
pub use renderer::{RENDER_LOG, RENDERED_DOCUMENT, ReportRenderer};
pub use template::{DEFAULT_TEMPLATE, TEMPLATE_FILE, load_template, substitute_results_dir};
