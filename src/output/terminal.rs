//! Terminal output for state files.
//!
//! Rendering produces plain lines so it can be tested; printing adds colour.

use crate::models::{AllocationState, Cidr, Interval};
use crate::processing::{Counter, NetworkAggregate, SubnetTracker};
use crate::store::StateDoc;
use colored::Colorize;

/// Format a value as a right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// The value padded on the left, or unchanged when it is already wider
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let value_str = value.to_string();
    if value_str.len() >= width {
        value_str
    } else {
        format!("{value_str:>width$}")
    }
}

fn block_row(idx: usize, cidr: &Cidr) -> String {
    format!(
        "{} {} {} {} {}",
        format_field(idx, 4),
        format_field(cidr, 20),
        format_field(cidr.first(), 16),
        format_field(cidr.last(), 16),
        format_field(cidr.capacity(), 10),
    )
}

fn interval_row(idx: usize, interval: &Interval) -> String {
    format!("{} {}", format_field(idx, 4), interval)
}

/// Lines describing a subnet tracker: a summary then one row per vacant block.
pub fn render_subnet(tracker: &SubnetTracker) -> Vec<String> {
    let mut lines = vec![format!(
        "subnet {} capacity {} left {} state {}",
        tracker.root(),
        tracker.capacity(),
        tracker.capacity_left(),
        tracker.state()
    )];
    lines.extend(
        tracker
            .vacant()
            .iter()
            .enumerate()
            .map(|(idx, cidr)| block_row(idx, cidr)),
    );
    lines
}

/// Lines describing a network: one summary and the roots of each family.
pub fn render_network(network: &NetworkAggregate) -> Vec<String> {
    let mut lines = Vec::new();
    for (family, list) in [("ipv4", network.ipv4()), ("ipv6", network.ipv6())] {
        lines.push(format!(
            "{family} roots {} capacity {}",
            list.roots().len(),
            list.capacity()
        ));
        lines.extend(
            list.roots()
                .iter()
                .enumerate()
                .map(|(idx, cidr)| block_row(idx, cidr)),
        );
    }
    lines
}

/// Lines describing a counter.
pub fn render_counter(counter: &Counter, label: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "counter {label} intervals {} state {}",
        counter.vacant().len(),
        counter.state()
    )];
    lines.extend(
        counter
            .vacant()
            .iter()
            .enumerate()
            .map(|(idx, iv)| interval_row(idx, iv)),
    );
    lines
}

/// Lines describing any state document. Fails when the document does not
/// rebuild into a consistent tracker.
pub fn render_state(doc: &StateDoc) -> crate::error::Result<Vec<String>> {
    let lines = match doc {
        StateDoc::Subnet(status) => {
            let mut lines = render_subnet(&SubnetTracker::from_status(status)?);
            if let Some(message) = &status.message {
                lines.push(format!("message: {message}"));
            }
            lines
        }
        StateDoc::Network(status) => render_network(&NetworkAggregate::from_status(status)?),
        StateDoc::Counter(counter_doc) => render_counter(
            &Counter::from_doc(counter_doc)?,
            &counter_doc.network_type.to_string(),
        ),
    };
    Ok(lines)
}

fn highlight(line: &str, idx: usize, doc: &StateDoc) -> String {
    if idx > 0 && !line.starts_with("ipv") {
        return line.to_string();
    }
    let failed = match doc {
        StateDoc::Subnet(status) => status.state == AllocationState::Failed,
        StateDoc::Network(status) => status.state == AllocationState::Failed,
        StateDoc::Counter(counter_doc) => counter_doc.vacant.is_empty(),
    };
    if failed {
        line.red().bold().to_string()
    } else {
        line.green().bold().to_string()
    }
}

/// Print a state document to stdout, headers coloured by health.
pub fn print_state(doc: &StateDoc) -> crate::error::Result<()> {
    for (idx, line) in render_state(doc)?.iter().enumerate() {
        println!("{}", highlight(line, idx, doc));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NetworkType;

    #[test]
    fn test_format_field_short() {
        assert_eq!(format_field("test", 10), "      test");
    }

    #[test]
    fn test_format_field_long() {
        assert_eq!(format_field("long_value", 5), "long_value");
    }

    #[test]
    fn test_format_field_number() {
        assert_eq!(format_field(42, 6), "    42");
    }

    #[test]
    fn test_render_subnet() {
        let mut tracker = SubnetTracker::fill_from(Cidr::parse("10.0.0.0/24").unwrap());
        tracker.reserve(&Cidr::parse("10.0.0.0/26").unwrap()).unwrap();
        let lines = render_subnet(&tracker);
        assert_eq!(lines[0], "subnet 10.0.0.0/24 capacity 256 left 192 state Allocated");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("10.0.0.64/26"));
        assert!(lines[2].trim_end().ends_with("128"));
    }

    #[test]
    fn test_render_counter() {
        let doc = Counter::for_type(NetworkType::Mpls).to_doc(NetworkType::Mpls);
        let lines = render_state(&StateDoc::Counter(doc)).unwrap();
        assert_eq!(lines, vec!["counter mpls intervals 1 state Active", "   0 [16, +inf]"]);
    }

    #[test]
    fn test_render_network() {
        let mut net = NetworkAggregate::new();
        net.reserve(&Cidr::parse("fd00::/64").unwrap()).unwrap();
        let lines = render_network(&net);
        assert_eq!(lines[0], "ipv4 roots 0 capacity 0");
        assert_eq!(lines[1], "ipv6 roots 1 capacity 18446744073709551616");
    }
}
