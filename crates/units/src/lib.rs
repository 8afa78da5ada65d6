// ABOUTME: Pure string-to-number and string-to-timestamp converters used by extraction filters.
// ABOUTME: Provides byte-size, number, relative-duration, zoned-time and obfuscated e-mail parsing.

pub mod email;
pub mod number;
pub mod size;
pub mod time_parse;
pub mod ttl;

pub use email::cf_decode_email;
pub use number::{find_then_parse_number, parse_number};
pub use size::{find_then_parse_size, parse_size};
pub use time_parse::{parse_offset, parse_time, parse_time_with_zone};
pub use ttl::{canonical_unit, parse_ttl, parse_ttl_at, DateUnit};
