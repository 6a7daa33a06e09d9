#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    if let Ok(program) = eva::parse_program(source) {
        // Whatever parses must print back to something that parses the same way
        for expression in program {
            assert_eq!(eva::parse(&expression.to_string()).ok(), Some(expression));
        }
    }
});
