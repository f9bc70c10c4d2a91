mod common;

use code_knowledge_graph::analyzers::base::LanguageAnalyzer;
use code_knowledge_graph::analyzers::go::GoAnalyzer;
use code_knowledge_graph::core::records::{CodeFile, GraphBatch};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use common::{find, has_edge, labels_of, line_of, line_prop};
use serde_json::json;

const SERVER_GO: &str = r#"package server

import (
	"fmt"
	str "strings"
)

import "net/http"

const MaxConns = 10

const (
	modeA = iota
	modeB
)

// Server owns the listener.
type Server struct {
	Name string // display name
	port int    `json:"port"`
	http.Handler
}

type Handler interface {
	Serve(req string) error
}

type ID string

func NewServer(name string) *Server {
	return &Server{Name: name}
}

func (s *Server) Start() error {
	s.listen()
	fmt.Println(str.ToUpper(s.Name))
	return nil
}

func (s *Server) listen() {
}
"#;

fn analyze() -> GraphBatch {
    let file = CodeFile::from_content("server/server.go", "go", SERVER_GO);
    GoAnalyzer.analyze(&file, &file.file_entity())
}

#[test]
fn first_entity_is_the_file() {
    let batch = analyze();
    assert_eq!(batch.entities[0].entity_type, EntityType::File);
    assert_eq!(batch.entities[0].label, "server.go");
}

#[test]
fn package_and_imports() {
    let batch = analyze();
    let file = &batch.entities[0];
    let pkg = find(&batch, EntityType::Package, "server");
    assert!(has_edge(&batch, file, RelationshipType::Defines, pkg));

    assert_eq!(labels_of(&batch, EntityType::Import), vec!["fmt", "str", "http"]);
    let aliased = find(&batch, EntityType::Import, "str");
    assert_eq!(aliased.prop_str("source"), Some("strings"));
    assert_eq!(aliased.prop_str("alias"), Some("str"));
    let http = find(&batch, EntityType::Import, "http");
    assert_eq!(http.prop_str("source"), Some("net/http"));
    assert!(has_edge(&batch, file, RelationshipType::Imports, http));
}

#[test]
fn structs_become_classes_with_fields() {
    let batch = analyze();
    let server = find(&batch, EntityType::Class, "Server");
    assert_eq!(server.properties["structType"], json!(true));
    assert_eq!(line_prop(server), Some(line_of(SERVER_GO, "type Server struct")));

    let name = find(&batch, EntityType::Property, "Name");
    assert_eq!(name.prop_str("type"), Some("string"));
    assert_eq!(name.properties["isExported"], json!(true));
    let port = find(&batch, EntityType::Property, "port");
    assert_eq!(port.prop_str("type"), Some("int"));
    assert_eq!(port.properties["isExported"], json!(false));
    let embedded = find(&batch, EntityType::Property, "Handler");

    for field in [name, port, embedded] {
        assert!(has_edge(&batch, server, RelationshipType::Contains, field));
    }
}

#[test]
fn interfaces_carry_abstract_methods() {
    let batch = analyze();
    let handler = find(&batch, EntityType::Interface, "Handler");
    assert_eq!(handler.properties["methods"], json!(["Serve"]));
    let serve = find(&batch, EntityType::Method, "Serve");
    assert_eq!(serve.properties["abstract"], json!(true));
    assert!(has_edge(&batch, handler, RelationshipType::Contains, serve));
}

#[test]
fn named_types_and_constants() {
    let batch = analyze();
    let id = find(&batch, EntityType::Type, "ID");
    assert_eq!(id.prop_str("definition"), Some("string"));

    let max = find(&batch, EntityType::Constant, "MaxConns");
    assert_eq!(max.prop_str("value"), Some("10"));
    assert_eq!(max.properties["isExported"], json!(true));
    assert_eq!(
        labels_of(&batch, EntityType::Constant),
        vec!["MaxConns", "modeA", "modeB"]
    );
}

#[test]
fn functions_and_receiver_methods() {
    let batch = analyze();
    let file = &batch.entities[0];
    let server = find(&batch, EntityType::Class, "Server");

    let ctor = find(&batch, EntityType::Function, "NewServer");
    assert_eq!(ctor.properties["parameters"], json!(["name string"]));
    assert_eq!(ctor.properties["returnTypes"], json!(["*Server"]));
    assert!(has_edge(&batch, file, RelationshipType::Defines, ctor));

    let start = find(&batch, EntityType::Method, "Start");
    assert_eq!(start.prop_str("receiver"), Some("s *Server"));
    assert_eq!(start.properties["returnTypes"], json!(["error"]));
    assert!(has_edge(&batch, server, RelationshipType::Contains, start));
    assert!(!has_edge(&batch, file, RelationshipType::Defines, start));
}

#[test]
fn calls_link_to_callables_in_the_same_file() {
    let batch = analyze();
    let start = find(&batch, EntityType::Method, "Start");
    let listen = find(&batch, EntityType::Method, "listen");
    assert!(has_edge(&batch, start, RelationshipType::Calls, listen));

    let calls: Vec<_> = batch.relationships_of_type(RelationshipType::Calls).collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].properties["lineNumber"], json!(line_of(SERVER_GO, "s.listen()")));
}

#[test]
fn empty_file_yields_only_the_file_entity() {
    let file = CodeFile::from_content("empty.go", "go", "");
    let batch = GoAnalyzer.analyze(&file, &file.file_entity());
    assert_eq!(batch.entities.len(), 1);
    assert!(batch.relationships.is_empty());
}
