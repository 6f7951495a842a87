use ratlisp::builtins::create_global_env;
use ratlisp::evaluate_one;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() {
    println!("ratlisp - exact fractions, closures, quasiquote");
    println!("Enter forms like: (/ 1 3) or `(1 ,(+ 1 2))");
    println!("Type (quit) or Ctrl-D to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("could not initialize line editor");
    let env = create_global_env();

    loop {
        match rl.readline("ratlisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                // One form per line; an error aborts only this form.
                match evaluate_one(line, &env) {
                    Ok(value) => println!("{value}"),
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }
}
