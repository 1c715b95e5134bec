use console::Style;
use tomoflow_core::operation::{OperationRecord, ParamSource, Registry};
use tomoflow_core::pipeline::PipelineConfig;
use tomoflow_core::stack::ImageStack;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_operations(registry: &Registry) {
    let s = Styles::new();
    print_title(&s, "Operations");

    for descriptor in registry.descriptors() {
        if descriptor.available() {
            println!(
                "  {:<22}{}",
                s.method.apply_to(descriptor.name()),
                s.value.apply_to(descriptor.display_name())
            );
        } else {
            println!(
                "  {:<22}{}",
                s.disabled.apply_to(descriptor.name()),
                s.disabled.apply_to(format!(
                    "unavailable: {}",
                    descriptor.unavailable_reason().unwrap_or("unknown")
                ))
            );
        }
        for spec in descriptor.params() {
            let mut notes = Vec::new();
            if spec.required {
                notes.push("required".to_string());
            }
            if let Some(default) = &spec.default {
                notes.push(format!("default {default}"));
            }
            if let ParamSource::Stack(param) = spec.source {
                notes.push(format!("from stack {param}"));
            }
            println!(
                "    {:<20}{} {}",
                s.label.apply_to(spec.name),
                spec.kind,
                s.label.apply_to(if notes.is_empty() {
                    String::new()
                } else {
                    format!("({})", notes.join(", "))
                })
            );
        }
    }
    println!();
}

pub fn print_stack(stack: &ImageStack, source: &str) {
    let s = Styles::new();
    let (h, w) = stack.image_dim();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(source)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(format!("{} x {h}x{w}", stack.num_images()))
    );
    let references = if stack.flat().is_some() {
        s.method.apply_to("flat + dark".to_string())
    } else {
        s.disabled.apply_to("none".to_string())
    };
    println!("  {:<14}{}", s.label.apply_to("References"), references);
    if let Some(roi) = stack.roi() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("ROI"),
            s.value.apply_to(roi)
        );
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig, stack: &ImageStack, source: &str) {
    let s = Styles::new();
    print_title(&s, "Tomoflow Pipeline");
    print_stack(stack, source);

    let workers = if config.execution.parallel {
        s.method
            .apply_to(format!("{} threads", config.execution.cores))
    } else {
        s.disabled.apply_to("sequential".to_string())
    };
    println!("  {:<14}{}", s.label.apply_to("Workers"), workers);
    println!();

    println!("  {}", s.header.apply_to("Steps"));
    if config.steps.is_empty() {
        println!("    {}", s.disabled.apply_to("none"));
    }
    for (i, step) in config.steps.iter().enumerate() {
        let kwargs: Vec<String> = step
            .kwargs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        println!(
            "    {:>2}. {:<22}{}",
            i + 1,
            s.method.apply_to(&step.operation),
            s.label.apply_to(kwargs.join(" "))
        );
    }
    println!();
}

pub fn print_history(history: &[OperationRecord]) {
    let s = Styles::new();
    print_title(&s, "Operation History");

    if history.is_empty() {
        println!("  {}", s.disabled.apply_to("no operations recorded"));
    }
    for (i, record) in history.iter().enumerate() {
        println!(
            "  {:>2}. {}",
            i + 1,
            s.method.apply_to(record.friendly_name())
        );
        for (key, value) in record.kwargs() {
            println!(
                "      {:<20}{}",
                s.label.apply_to(key),
                s.value.apply_to(value)
            );
        }
    }
    println!();
}
