//! Fuzz target: tag-value payload parser
//!
//! Arbitrary bytes must parse or fail with a typed error. Anything that
//! parses must survive a write/parse cycle unchanged.
//!
//! cargo fuzz run fuzz_tag_value

#![no_main]

use libfuzzer_sys::fuzz_target;
use menulink::protocol::tag_value;

fuzz_target!(|data: &[u8]| {
    let Ok((fields, used)) = tag_value::parse(data) else {
        return;
    };
    assert!(used <= data.len());

    let pairs: Vec<(&str, &str)> = fields.iter().collect();
    let rewritten = tag_value::write(&pairs);
    let (again, _) = tag_value::parse(&rewritten).expect("rewritten payload parses");
    assert_eq!(again, fields);
});
