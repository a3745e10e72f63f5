use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use env_logger::Builder;
use log::{info, LevelFilter};

use jieba_wordcloud_rs::{
    strip_floor_markers, top_k_with_counts, KeywordPipeline, PipelineConfig,
};

const MODE_LIST: [&str; 4] = ["keywords", "counts", "cloud", "clean"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const BLUE: &str = "\x1B[1;34m";
    const RESET: &str = "\x1B[0m";
    let matches = Command::new("Jieba WordCloud")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("file")
                .help("Read original text from <file>."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("file")
                .help("Write result to <file>."),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("mode")
                .default_value("keywords")
                .help("Output: [keywords|counts|cloud|clean]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("file")
                .help("Pipeline configuration JSON file."),
        )
        .arg(
            Arg::new("top_k")
                .short('k')
                .long("top-k")
                .value_name("number")
                .value_parser(clap::value_parser!(usize))
                .help("Number of keywords to print."),
        )
        .arg(
            Arg::new("pos")
                .short('p')
                .long("pos")
                .action(ArgAction::SetTrue)
                .help("Keep only content-bearing parts of speech."),
        )
        .arg(
            Arg::new("stopwords")
                .short('s')
                .long("stopwords")
                .value_name("dir")
                .help("Directory of stopword lists."),
        )
        .arg(
            Arg::new("save_stopwords")
                .long("save-stopwords")
                .value_name("file")
                .help("Write the merged stopword set to <file> (.json, .txt, optionally .zst)."),
        )
        .arg(
            Arg::new("font")
                .short('f')
                .long("font")
                .value_name("file")
                .help("Font embedded in the word cloud."),
        )
        .arg(
            Arg::new("strip_floors")
                .long("strip-floors")
                .action(ArgAction::SetTrue)
                .help("Remove forum floor markers (B12, B12-3) before processing."),
        )
        .arg(
            Arg::new("in_enc")
                .long("in-enc")
                .value_name("encoding")
                .default_value("UTF-8")
                .help("Encoding for input"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug)."),
        )
        .about(format!(
            "{}Jieba WordCloud: keywords and word clouds from Chinese news and forum text{}",
            BLUE, RESET
        ))
        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let mode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("keywords");
    if !MODE_LIST.contains(&mode) {
        eprintln!("Invalid mode: {}", mode);
        eprintln!("Valid modes are: [keywords|counts|cloud|clean]");
        return Ok(());
    }

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(&k) = matches.get_one::<usize>("top_k") {
        config.top_k = k;
    }
    if matches.get_flag("pos") {
        config.pos_filter = true;
    }
    if let Some(dir) = matches.get_one::<String>("stopwords") {
        config.stopword_dir = PathBuf::from(dir);
        config.stopword_paths.clear();
    }
    if let Some(font) = matches.get_one::<String>("font") {
        config.font_path = PathBuf::from(font);
    }

    let input_file = matches.get_one::<String>("input");
    let output_file = matches.get_one::<String>("output");
    let in_enc = matches
        .get_one::<String>("in_enc")
        .map(String::as_str)
        .unwrap_or("UTF-8");

    if input_file.is_none() {
        eprintln!("{BLUE}Input text, <ctrl-z> or <ctrl-d> to submit:{RESET}");
    }
    let mut input_str = read_input(input_file, in_enc)?;
    if matches.get_flag("strip_floors") {
        input_str = strip_floor_markers(&input_str);
    }

    let pipeline = KeywordPipeline::from_config(&config)?;
    if let Some(path) = matches.get_one::<String>("save_stopwords") {
        pipeline.stopwords()?.save(path)?;
    }
    let output_str = match mode {
        "clean" => pipeline.clean(&input_str),
        "counts" => serde_json::to_string_pretty(&pipeline.word_counts(&input_str)?)?,
        "cloud" => pipeline.word_cloud(&input_str)?,
        _ => {
            let counts = pipeline.word_counts(&input_str)?;
            top_k_with_counts(&counts, pipeline.top_k())
                .into_iter()
                .map(|(word, n)| format!("{word}\t{n}"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    let output: Box<dyn Write> = match output_file {
        Some(file_name) => Box::new(File::create(file_name)?),
        None => Box::new(io::stdout()),
    };
    let mut output_buf = BufWriter::new(output);
    writeln!(output_buf, "{}", output_str)?;
    output_buf.flush()?;

    info!(
        "{} completed: {} -> {}",
        mode,
        input_file.map_or("<stdin>", String::as_str),
        output_file.map_or("stdout", String::as_str)
    );

    Ok(())
}

fn read_input(input_file: Option<&String>, in_enc: &str) -> Result<String, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    match input_file {
        Some(file_name) => {
            File::open(file_name)?.read_to_end(&mut bytes)?;
        }
        None => {
            io::stdin().read_to_end(&mut bytes)?;
        }
    }

    if in_enc.eq_ignore_ascii_case("UTF-8") {
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    let encoding = Encoding::for_label(in_enc.as_bytes()).ok_or_else(|| {
        let err_msg = format!("Unsupported input encoding: {}", in_enc);
        io::Error::new(io::ErrorKind::Other, err_msg)
    })?;
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(&*bytes);
    let mut input_str = String::new();
    decoder.read_to_string(&mut input_str)?;
    Ok(input_str)
}
