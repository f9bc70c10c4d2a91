mod common;

use code_knowledge_graph::analyzers::base::LanguageAnalyzer;
use code_knowledge_graph::analyzers::typescript::TypeScriptAnalyzer;
use code_knowledge_graph::core::records::{CodeFile, GraphBatch};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use common::{find, has_edge, labels_of, line_of, line_prop};
use serde_json::json;

const DOG_TS: &str = r#"import React, { useState, useEffect as effect } from 'react';
import * as path from 'path';
import './styles.css';
import {
  helper,
  format,
} from './utils';
const fs = require('fs');

export interface Shape extends Base {
  area(): number;
}

export type Id = string | number;

export enum Color { Red, Green }

export abstract class Animal {
  abstract speak(): void;
}

// the good boy
export class Dog extends Animal implements Shape {
  private readonly name: string;
  static count = 0;
  onClick = async (e) => {
    this.bark();
  };

  constructor(name: string) {
    super();
    this.name = name;
  }

  public async bark(times: number): Promise<void> {
    if (times > 0) {
      console.log(this.name);
    }
  }

  area(): number {
    return compute(2);
  }
}

export function compute(x: number): number {
  return x * 2;
}

export const double = (n: number) => n * 2;
"#;

fn analyze() -> GraphBatch {
    let file = CodeFile::from_content("src/dog.ts", "typescript", DOG_TS);
    TypeScriptAnalyzer.analyze(&file, &file.file_entity())
}

#[test]
fn import_forms() {
    let batch = analyze();
    assert_eq!(
        labels_of(&batch, EntityType::Import),
        vec!["React", "useState", "useEffect", "path", "./styles.css", "helper", "format", "fs"]
    );

    let react = find(&batch, EntityType::Import, "React");
    assert_eq!(react.prop_str("source"), Some("react"));
    assert_eq!(react.properties["isDefault"], json!(true));

    let effect = find(&batch, EntityType::Import, "useEffect");
    assert_eq!(effect.prop_str("alias"), Some("effect"));
    assert_eq!(effect.properties["isDefault"], json!(false));

    let path = find(&batch, EntityType::Import, "path");
    assert_eq!(path.properties["isNamespace"], json!(true));

    let css = find(&batch, EntityType::Import, "./styles.css");
    assert_eq!(css.properties["isSideEffect"], json!(true));

    let helper = find(&batch, EntityType::Import, "helper");
    assert_eq!(helper.prop_str("source"), Some("./utils"));
    assert_eq!(line_prop(helper), Some(line_of(DOG_TS, "import {")));

    let fs = find(&batch, EntityType::Import, "fs");
    assert_eq!(fs.prop_str("source"), Some("fs"));
    assert_eq!(fs.properties["isDefault"], json!(true));
}

#[test]
fn type_level_declarations() {
    let batch = analyze();
    let file = &batch.entities[0];

    let shape = find(&batch, EntityType::Interface, "Shape");
    assert_eq!(shape.properties["extends"], json!(["Base"]));
    assert_eq!(shape.properties["isExported"], json!(true));

    let id = find(&batch, EntityType::Type, "Id");
    assert_eq!(id.prop_str("definition"), Some("string | number"));

    let color = find(&batch, EntityType::Enum, "Color");
    for e in [shape, id, color] {
        assert!(has_edge(&batch, file, RelationshipType::Defines, e));
    }
}

#[test]
fn classes_and_members() {
    let batch = analyze();
    let animal = find(&batch, EntityType::Class, "Animal");
    assert_eq!(animal.properties["isAbstract"], json!(true));
    let speak = find(&batch, EntityType::Method, "speak");
    assert_eq!(speak.properties["abstract"], json!(true));
    assert!(has_edge(&batch, animal, RelationshipType::Contains, speak));

    let dog = find(&batch, EntityType::Class, "Dog");
    assert_eq!(dog.properties["extends"], json!(["Animal"]));
    assert_eq!(dog.properties["implements"], json!(["Shape"]));

    let name = find(&batch, EntityType::Property, "name");
    assert_eq!(name.prop_str("visibility"), Some("private"));
    assert_eq!(name.properties["isReadonly"], json!(true));
    assert_eq!(name.prop_str("type"), Some("string"));

    let count = find(&batch, EntityType::Property, "count");
    assert_eq!(count.properties["isStatic"], json!(true));

    let on_click = find(&batch, EntityType::Method, "onClick");
    assert_eq!(on_click.properties["isArrow"], json!(true));
    assert_eq!(on_click.properties["isAsync"], json!(true));

    let bark = find(&batch, EntityType::Method, "bark");
    assert_eq!(bark.prop_str("visibility"), Some("public"));
    assert_eq!(bark.properties["isAsync"], json!(true));
    assert_eq!(bark.properties["parameters"], json!(["times: number"]));
    assert_eq!(bark.prop_str("returnType"), Some("Promise<void>"));

    let ctor = find(&batch, EntityType::Method, "constructor");
    let area = find(&batch, EntityType::Method, "area");
    for member in [name, count, on_click, bark, ctor, area] {
        assert!(has_edge(&batch, dog, RelationshipType::Contains, member));
    }

    // statements inside method bodies are not members
    assert!(batch.entities.iter().all(|e| e.label != "if" && e.label != "super"));
    assert_eq!(
        labels_of(&batch, EntityType::Method),
        vec!["speak", "onClick", "constructor", "bark", "area"]
    );
}

#[test]
fn functions_and_arrow_functions() {
    let batch = analyze();
    let compute = find(&batch, EntityType::Function, "compute");
    assert_eq!(compute.properties["parameters"], json!(["x: number"]));
    assert_eq!(compute.prop_str("returnType"), Some("number"));

    let double = find(&batch, EntityType::Function, "double");
    assert_eq!(double.properties["isArrow"], json!(true));
    assert_eq!(double.properties["parameters"], json!(["n: number"]));
}

#[test]
fn supertypes_link_within_the_file() {
    let batch = analyze();
    let dog = find(&batch, EntityType::Class, "Dog");
    let animal = find(&batch, EntityType::Class, "Animal");
    let shape = find(&batch, EntityType::Interface, "Shape");
    assert!(has_edge(&batch, dog, RelationshipType::Extends, animal));
    assert!(has_edge(&batch, dog, RelationshipType::Implements, shape));
    // Base is not declared here
    assert_eq!(batch.relationships_of_type(RelationshipType::Extends).count(), 1);
}

#[test]
fn call_sites() {
    let batch = analyze();
    let on_click = find(&batch, EntityType::Method, "onClick");
    let bark = find(&batch, EntityType::Method, "bark");
    let area = find(&batch, EntityType::Method, "area");
    let compute = find(&batch, EntityType::Function, "compute");
    assert!(has_edge(&batch, on_click, RelationshipType::Calls, bark));
    assert!(has_edge(&batch, area, RelationshipType::Calls, compute));
    assert_eq!(batch.relationships_of_type(RelationshipType::Calls).count(), 2);
}

#[test]
fn javascript_uses_the_same_analyzer() {
    let src = "const express = require('express');\nfunction start(port) {\n  listen(port);\n}\nfunction listen(p) {}\n";
    let file = CodeFile::from_content("server.js", "javascript", src);
    let batch = TypeScriptAnalyzer.analyze(&file, &file.file_entity());
    let start = find(&batch, EntityType::Function, "start");
    let listen = find(&batch, EntityType::Function, "listen");
    assert!(has_edge(&batch, start, RelationshipType::Calls, listen));
    assert_eq!(labels_of(&batch, EntityType::Import), vec!["express"]);
}

#[test]
fn empty_one_line_class_does_not_own_the_next_body() {
    let src = "export class Empty {}\nclass FooError extends Error {}\nfunction helper() {\n  doThing();\n}\nfunction doThing() {\n  return 1;\n}\n";
    let file = CodeFile::from_content("src/errors.ts", "typescript", src);
    let batch = TypeScriptAnalyzer.analyze(&file, &file.file_entity());

    assert_eq!(labels_of(&batch, EntityType::Class), vec!["Empty", "FooError"]);
    assert!(labels_of(&batch, EntityType::Method).is_empty());
    assert_eq!(labels_of(&batch, EntityType::Function), vec!["helper", "doThing"]);
    assert_eq!(batch.relationships_of_type(RelationshipType::Contains).count(), 0);

    let helper = find(&batch, EntityType::Function, "helper");
    let do_thing = find(&batch, EntityType::Function, "doThing");
    assert!(has_edge(&batch, helper, RelationshipType::Calls, do_thing));
}

#[test]
fn one_line_method_bodies() {
    let src = "class Point {\n  private x = 0;\n  getX(): number { return this.clamp(this.x); }\n  clamp(v: number): number {\n    return v;\n  }\n}\n";
    let file = CodeFile::from_content("src/point.ts", "typescript", src);
    let batch = TypeScriptAnalyzer.analyze(&file, &file.file_entity());

    let point = find(&batch, EntityType::Class, "Point");
    assert_eq!(labels_of(&batch, EntityType::Method), vec!["getX", "clamp"]);
    let get_x = find(&batch, EntityType::Method, "getX");
    assert_eq!(get_x.prop_str("returnType"), Some("number"));
    assert!(get_x.properties.get("abstract").is_none());
    assert!(has_edge(&batch, point, RelationshipType::Contains, get_x));

    let clamp = find(&batch, EntityType::Method, "clamp");
    assert!(has_edge(&batch, get_x, RelationshipType::Calls, clamp));
}
