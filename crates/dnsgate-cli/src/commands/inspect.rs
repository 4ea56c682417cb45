//! Inspect command - decode a raw packet and show the verdict

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use dnsgate_core::packet::{DnsMessage, Ip4Header, Protocol, UdpHeader};
use dnsgate_core::{Config, DecisionEngine};

use super::{load_blocklist, BlocklistArgs};

/// Inspect command arguments
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Packet bytes as hex; whitespace, `:` and a leading `0x` are ignored
    #[arg(value_name = "HEX")]
    pub packet: String,

    #[command(flatten)]
    pub blocklist: BlocklistArgs,
}

/// Execute the inspect command
pub fn execute(args: InspectArgs, mut config: Config) -> Result<()> {
    args.blocklist.apply(&mut config.filter);
    let packet = decode_hex(&args.packet)?;
    let (blocklist, _) = load_blocklist(&config.filter)?;

    print_headers(&packet);

    let engine = DecisionEngine::new(config.filter.failure_policy);
    let decision = engine.decide(&packet, &blocklist);
    let verdict = if decision.is_block() {
        "block".red().bold()
    } else {
        "allow".green().bold()
    };
    println!();
    println!("Verdict: {} ({})", verdict, decision.reason);
    Ok(())
}

/// Parse a hex dump into bytes
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if digits.is_empty() {
        bail!("Empty packet");
    }
    hex::decode(&digits).context("Packet is not valid hex")
}

fn print_headers(packet: &[u8]) {
    println!("{} {} bytes", "Packet:".bold(), packet.len());

    let ip = Ip4Header::from_bytes(packet);
    if !ip.is_valid() {
        println!("  {}", "not a valid IPv4 packet".yellow());
        return;
    }
    println!("{}", "IPv4".bold());
    println!("  header length: {}", ip.header_len());
    println!("  total length:  {}", ip.total_len());
    println!("  protocol:      {} ({:?})", ip.protocol_number(), ip.protocol());
    println!("  source:        {}", ip.source());
    println!("  destination:   {}", ip.destination());

    if ip.protocol() != Protocol::Udp {
        return;
    }
    let Some(transport) = ip.payload() else {
        return;
    };
    let udp = UdpHeader::from_view(transport);
    if !udp.is_valid() {
        println!("  {}", "truncated UDP header".yellow());
        return;
    }
    println!("{}", "UDP".bold());
    println!("  source port:      {}", udp.source_port());
    println!("  destination port: {}", udp.destination_port());
    println!("  length:           {}", udp.length());

    if !udp.is_dns() {
        return;
    }
    let Some(dns) = udp.payload().and_then(DnsMessage::parse) else {
        println!("  {}", "no DNS header".yellow());
        return;
    };
    println!("{}", "DNS".bold());
    println!("  id:        {:#06x}", dns.id());
    println!("  response:  {}", dns.is_response());
    println!("  questions: {}", dns.question_count());

    match dns.question() {
        Some(question) => {
            println!("  name:      {}", question.name());
            println!("  labels:    {} ({:?})", question.label_count(), question.end());
            if let (Some(qtype), Some(qclass)) = (question.qtype(), question.qclass()) {
                println!("  qtype:     {}  qclass: {}", qtype, qclass);
            }
        }
        None => println!("  {}", "no question".yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_formats() {
        assert_eq!(decode_hex("45 00 00 14").unwrap(), vec![0x45, 0x00, 0x00, 0x14]);
        assert_eq!(decode_hex("0x4500").unwrap(), vec![0x45, 0x00]);
        assert_eq!(decode_hex("45:00:AB").unwrap(), vec![0x45, 0x00, 0xAB]);
        assert!(decode_hex("").is_err());
        assert!(decode_hex("450").is_err());
        assert!(decode_hex("zz").is_err());
    }
}
