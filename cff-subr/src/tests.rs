use super::*;
use test_case::test_case;

#[test_case(Format::Cff, 0 => 65535; "cff default")]
#[test_case(Format::Cff, 2 => 2; "cff small")]
#[test_case(Format::Cff, 65535 => 65535; "cff maximum")]
#[test_case(Format::Cff, 100_000 => 65535; "cff clamped")]
#[test_case(Format::Cff2, 0 => 65535; "cff2 default")]
#[test_case(Format::Cff2, 100_000 => 65535; "cff2 clamped")]
fn max_subrs(format: Format, limit: u32) -> usize {
    Config {
        max_subrs: limit,
        format,
        ..Default::default()
    }
    .max_subrs()
}
