// Built-in criteria profiles the store is seeded with at startup

use serde_json::json;

use super::record::CriteriaRecord;

pub fn seed_records() -> Vec<CriteriaRecord> {
    vec![
        CriteriaRecord {
            title: "backend_infrastructure".to_string(),
            description: "Covers networks used to manage backend servers and databases. \
                          Appropriate for ensuring that database and backend API server \
                          requests are validated and not coming from unauthorized or \
                          foreign locations."
                .to_string(),
            criteria: json!({
                "protocols": ["TCP"],
                "ports": [3306, 5432, 6379, 27017, 8080, 443],
                "ip_ranges": ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"],
                "track_fields": [
                    "source_ip",
                    "destination_ip",
                    "transport_layer.protocol",
                    "transport_layer.source_port",
                    "transport_layer.destination_port",
                    "transport_layer.flags",
                    "payload.length"
                ],
                "alert_conditions": {
                    "unauthorized_ip": "source_ip not in ip_ranges",
                    "suspicious_ports": "destination_port not in ports",
                    "large_payload": "payload.length > 1000000"
                }
            }),
            bpf_filter: "(ip src net 10.0.0.0/8 or ip src net 172.16.0.0/12 or \
                         ip src net 192.168.0.0/16) and (tcp port 3306 or tcp port 5432 or \
                         tcp port 6379 or tcp port 27017 or tcp port 8080 or tcp port 443)"
                .to_string(),
        },
        CriteriaRecord {
            title: "web_application".to_string(),
            description: "Covers hosting and managing web applications that serve content \
                          to end users: monitoring HTTP/HTTPS traffic, managing user \
                          sessions, and detecting potential DDoS or web attacks."
                .to_string(),
            criteria: json!({
                "protocols": ["TCP"],
                "ports": [80, 443, 8080, 8443],
                "track_fields": [
                    "transport_layer.protocol",
                    "transport_layer.flags",
                    "transport_layer.source_port",
                    "transport_layer.destination_port",
                    "application_layer.protocol",
                    "source_ip",
                    "payload.length"
                ],
                "alert_conditions": {
                    "syn_flood": "COUNT(transport_layer.flags.syn) > 1000 per minute",
                    "payload_size": "payload.length > 500000",
                    "error_rate": "COUNT(application_layer.status_code >= 400) > 100 per minute"
                }
            }),
            bpf_filter: "(ip src != '0.0.0.0') and (tcp port 80 or tcp port 443 or \
                         tcp port 8080 or tcp port 8443)"
                .to_string(),
        },
        CriteriaRecord {
            title: "general_usage".to_string(),
            description: "Covers general internet usage including web browsing, email, and \
                          common application traffic. Focuses on basic security monitoring \
                          and detecting unusual patterns in regular internet usage."
                .to_string(),
            criteria: json!({
                "protocols": ["TCP", "UDP"],
                "ports": [80, 443, 53, 25, 110, 143, 587, 993, 995],
                "track_fields": [
                    "timestamp",
                    "source_ip",
                    "destination_ip",
                    "transport_layer.protocol",
                    "transport_layer.destination_port",
                    "application_layer.protocol"
                ],
                "alert_conditions": {
                    "unusual_port": "destination_port not in common_ports",
                    "high_volume": "COUNT(packets) > 10000 per minute",
                    "suspicious_dns": "COUNT(destination_port = 53) > 100 per minute"
                }
            }),
            bpf_filter: "(ip src != '0.0.0.0') and (tcp port 80 or tcp port 443 or \
                         tcp port 53 or tcp port 25 or tcp port 110 or tcp port 143 or \
                         tcp port 587 or tcp port 993 or tcp port 995 or udp port 53)"
                .to_string(),
        },
    ]
}
