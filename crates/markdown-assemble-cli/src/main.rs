use std::process;

fn main() {
    match markdown_assemble_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("markdown-assemble error: {err}");
            process::exit(1);
        }
    }
}
