use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use civiclens_contracts::briefs::{MissionBrief, SocraticGuidance, SolutionTemplate};
use civiclens_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use civiclens_contracts::prompts::{MentorMode, TemplateKind};
use civiclens_contracts::report::{render_template_markdown, write_report};
use civiclens_engine::{
    IssueDetector, Mentor, MissionGenerator, Platform, PlatformConfig, ProblemClassifier,
    DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "civiclens", version, about = "Community issue analysis from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline on an image or a text description.
    Analyze(AnalyzeArgs),
    /// Detect community issues in one image.
    Detect(DetectArgs),
    /// Classify a problem description.
    Classify(ClassifyArgs),
    /// Generate a mission statement from a problem description.
    Mission(MissionArgs),
    /// Generate a solution template for a problem description.
    Template(TemplateArgs),
    /// Interactive mentoring session.
    Mentor(MentorArgs),
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    text: Option<String>,
    /// Session directory for events, analysis JSON and the report.
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long, default_value = DEFAULT_VISION_MODEL)]
    vision_model: String,
}

#[derive(Debug, Parser)]
struct DetectArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, default_value = DEFAULT_VISION_MODEL)]
    vision_model: String,
}

#[derive(Debug, Parser)]
struct ClassifyArgs {
    #[arg(long)]
    text: String,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
}

#[derive(Debug, Parser)]
struct MissionArgs {
    #[arg(long)]
    text: String,
    #[arg(long)]
    context: Option<String>,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
}

#[derive(Debug, Parser)]
struct TemplateArgs {
    #[arg(long)]
    text: String,
    /// swot, budget, action_plan, stakeholder or timeline; auto-detected
    /// from the description when omitted.
    #[arg(long)]
    kind: Option<String>,
    /// Write the rendered markdown here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
}

#[derive(Debug, Parser)]
struct MentorArgs {
    /// Session directory used by /analyze and /export.
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value = "critical_thinking")]
    mode: String,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long, default_value = DEFAULT_VISION_MODEL)]
    vision_model: String,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("civiclens error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Detect(args) => run_detect(args),
        Command::Classify(args) => run_classify(args),
        Command::Mission(args) => run_mission(args),
        Command::Template(args) => run_template(args),
        Command::Mentor(args) => run_mentor(args),
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let config = PlatformConfig::with_models(&args.text_model, &args.vision_model);
    let platform = Platform::new(&args.out, config)?;

    let summary = match (args.image.as_deref(), args.text.as_deref()) {
        (Some(image), None) => platform.process_image(image)?.summary,
        (None, Some(text)) => platform.process_text(text)?.summary,
        _ => bail!("pass exactly one of --image or --text"),
    };

    println!("{summary}");
    println!("Session artifacts in {}", platform.session_dir().display());
    Ok(0)
}

fn run_detect(args: DetectArgs) -> Result<i32> {
    let config = PlatformConfig::with_models(DEFAULT_TEXT_MODEL, &args.vision_model);
    let detector = IssueDetector::new(&config);
    let report = detector.detect_file(&args.image, None)?;
    println!("Domains analyzed: {}", report.domains_analyzed.join(", "));
    println!("\n{}", report.analysis);
    Ok(0)
}

fn run_classify(args: ClassifyArgs) -> Result<i32> {
    let config = PlatformConfig::with_models(&args.text_model, DEFAULT_VISION_MODEL);
    let classifier = ProblemClassifier::new(&config);
    let outcome = classifier.classify(&args.text, true)?;
    println!("Category: {}", outcome.classification.category);
    println!("Confidence: {}", outcome.classification.confidence.as_str());
    println!("Reasoning: {}", outcome.classification.reasoning);
    Ok(0)
}

fn run_mission(args: MissionArgs) -> Result<i32> {
    let config = PlatformConfig::with_models(&args.text_model, DEFAULT_VISION_MODEL);
    let generator = MissionGenerator::new(&config);
    let brief = generator.generate(&args.text, args.context.as_deref())?;
    print_mission(&brief);
    Ok(0)
}

fn run_template(args: TemplateArgs) -> Result<i32> {
    let kind = args
        .kind
        .as_deref()
        .map(|raw| {
            TemplateKind::parse(raw)
                .ok_or_else(|| anyhow::anyhow!("unknown template kind {raw:?}"))
        })
        .transpose()?;

    let config = PlatformConfig::with_models(&args.text_model, DEFAULT_VISION_MODEL);
    let mentor = Mentor::new(&config);
    let template = mentor.solution(&args.text, kind, None)?;
    let markdown = render_template_markdown(&template);

    match args.out {
        Some(path) => {
            write_report(&path, &markdown)?;
            println!("{} template written to {}", template.kind.title(), path.display());
        }
        None => println!("{markdown}"),
    }
    Ok(0)
}

fn run_mentor(args: MentorArgs) -> Result<i32> {
    let Some(mut mode) = MentorMode::parse(&args.mode) else {
        bail!("unknown mentor mode {:?}", args.mode);
    };
    let config = PlatformConfig::with_models(&args.text_model, &args.vision_model);
    let mut mentor = Mentor::new(&config);
    let platform = Platform::new(&args.out, config)?;
    let mut last_export: Option<String> = None;

    println!("CivicLens mentor started in {} mode. Type /help for commands.", mode.as_str());

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = stdin.read_line(&mut line)?;
        if read == 0 {
            break;
        }

        let intent = parse_intent(&line);
        let outcome = match intent.action.as_str() {
            "noop" => Ok(true),
            "quit" => Ok(false),
            "help" => {
                for command in CHAT_HELP_COMMANDS {
                    println!("  {command}");
                }
                Ok(true)
            }
            "clear" => {
                mentor.reset();
                println!("Conversation cleared.");
                Ok(true)
            }
            "mode" => {
                let raw = string_arg(&intent.command_args, "mode");
                match MentorMode::parse(&raw) {
                    Some(parsed) => {
                        mode = parsed;
                        println!("Mentor mode set to {}.", mode.as_str());
                    }
                    None => println!("Unknown mode {raw:?}; keeping {}.", mode.as_str()),
                }
                Ok(true)
            }
            "chat" => {
                let message = intent.message.clone().unwrap_or_default();
                mentor.chat(&message, mode).map(|reply| {
                    println!("{reply}");
                    true
                })
            }
            "think" => {
                let problem = string_arg(&intent.command_args, "problem");
                mentor.critical_thinking(&problem, None).map(|guidance| {
                    print_guidance(&guidance);
                    last_export = Some(guidance.full_response.clone());
                    true
                })
            }
            "solve" => {
                let problem = string_arg(&intent.command_args, "problem");
                let kind = intent
                    .command_args
                    .get("kind")
                    .and_then(Value::as_str)
                    .and_then(TemplateKind::parse);
                mentor.solution(&problem, kind, None).map(|template| {
                    print_template(&template);
                    last_export = Some(render_template_markdown(&template));
                    true
                })
            }
            "analyze" => run_mentor_analyze(&platform, &intent.command_args).map(|summary| {
                println!("{summary}");
                last_export = Some(summary);
                true
            }),
            "export" => {
                let result = match last_export.as_deref() {
                    Some(content) => {
                        let path = intent
                            .command_args
                            .get("path")
                            .and_then(Value::as_str)
                            .map(PathBuf::from)
                            .unwrap_or_else(|| args.out.join("mentor-report.txt"));
                        write_report(&path, content).map(|_| {
                            println!("Report written to {}", path.display());
                            true
                        })
                    }
                    None => {
                        println!("Nothing to export yet.");
                        Ok(true)
                    }
                };
                result
            }
            "unknown" => {
                println!(
                    "Unknown command /{}. Type /help for commands.",
                    string_arg(&intent.command_args, "command")
                );
                Ok(true)
            }
            _ => Ok(true),
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("civiclens error: {err:#}"),
        }
    }

    Ok(0)
}

fn run_mentor_analyze(
    platform: &Platform,
    command_args: &BTreeMap<String, Value>,
) -> Result<String> {
    match string_arg(command_args, "source").as_str() {
        "image" => {
            let path = PathBuf::from(string_arg(command_args, "path"));
            Ok(platform.process_image(&path)?.summary)
        }
        _ => {
            let text = string_arg(command_args, "text");
            if text.trim().is_empty() {
                bail!("describe the problem or name an image file");
            }
            Ok(platform.process_text(&text)?.summary)
        }
    }
}

fn string_arg(args: &BTreeMap<String, Value>, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn print_mission(brief: &MissionBrief) {
    println!("MISSION STATEMENT:\n{}\n", brief.mission_statement);
    if !brief.problem_definition.is_empty() {
        println!("PROBLEM DEFINITION:\n{}\n", brief.problem_definition);
    }
    if !brief.goal.is_empty() {
        println!("GOAL:\n{}\n", brief.goal);
    }
    if !brief.expected_impact.is_empty() {
        println!("EXPECTED IMPACT:\n{}\n", brief.expected_impact);
    }
    if !brief.action_steps.is_empty() {
        println!("ACTION STEPS:");
        for (idx, step) in brief.action_steps.iter().enumerate() {
            println!("{}. {step}", idx + 1);
        }
    }
}

fn print_guidance(guidance: &SocraticGuidance) {
    let blocks = [
        ("Guiding questions", &guidance.guiding_questions),
        ("Reflection prompts", &guidance.reflection_prompts),
        ("Challenge points", &guidance.challenge_points),
        ("Next steps", &guidance.next_steps),
    ];
    let mut printed = false;
    for (label, items) in blocks {
        if items.is_empty() {
            continue;
        }
        printed = true;
        println!("{label}:");
        for item in items {
            println!("  - {item}");
        }
        println!();
    }
    if !printed {
        println!("{}", guidance.full_response);
    }
}

fn print_template(template: &SolutionTemplate) {
    println!("{} template", template.kind.title());
    for (section, rows) in &template.outline {
        println!("\n{section}:");
        for row in rows {
            println!("  {row}");
        }
    }
    if !template.implementation_guide.is_empty() {
        println!("\nImplementation guide:\n{}", template.implementation_guide);
    }
    if !template.tips.is_empty() {
        println!("\nTips:");
        for tip in &template.tips {
            println!("  - {tip}");
        }
    }
}
