use std::process::Command;

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const BLUE: &str = "\x1b[34m";

pub fn print_info(s: impl AsRef<str>) {
    println!("\t{}[INFO]{}\t{}", BLUE, RESET, s.as_ref());
}

pub fn print_command(cmd: &Command) {
    let program = std::path::Path::new(cmd.get_program());
    print!(
        "\t{}[CMD]{}\t{}",
        GREEN,
        RESET,
        program
            .file_name()
            .unwrap_or(program.as_os_str())
            .to_string_lossy()
    );
    for arg in cmd.get_args() {
        print!(" {}", arg.to_string_lossy());
    }
    println!();
}
