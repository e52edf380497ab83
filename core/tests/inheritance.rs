use pretty_assertions::assert_eq;
use raml_core::raml::{merge_mappings, ResponseCode};
use raml_core::{
    AppError, Attribute, DiagnosticKind, Diagnostics, LoadedSchema, ParserConfig, RamlParser,
    SchemaLoader, Validator,
};
use serde_yaml::{Mapping, Value};

fn lenient() -> ParserConfig {
    ParserConfig {
        validate: false,
        ..ParserConfig::default()
    }
}

#[test]
fn test_optional_type_methods_need_a_declaration() {
    let doc = r#"
title: Optional
resourceTypes:
  - item:
      get?:
        description: Fetch <<resourcePathName>>
      delete:
        description: Remove <<resourcePathName>>
/plain:
  type: item
/declared:
  type: item
  get:
"#;
    let root = RamlParser::default().parse_str(doc).unwrap();
    let plain: Vec<_> = root.resources_at("/plain").filter_map(|r| r.method.clone()).collect();
    assert_eq!(plain, vec!["delete"]);

    let declared: Vec<_> = root.resources_at("/declared").filter_map(|r| r.method.clone()).collect();
    assert_eq!(declared, vec!["get", "delete"]);
    let get = root.resource("/declared", Some("get")).unwrap();
    assert_eq!(get.attributes.description.as_deref(), Some("Fetch declared"));
    assert!(get.resource_type.as_ref().unwrap().optional);
}

#[test]
fn test_assignment_parameters_are_substituted() {
    let doc = r#"
title: Library
traits:
  - searchable:
      queryParameters:
        query:
          description: Search <<resourcePathName>> by <<field>>
resourceTypes:
  - collection:
      get:
        description: All <<item | !pluralize>> in the <<methodName>> listing
/books:
  type: { collection: { item: book } }
  get:
    is: [ { searchable: { field: title } } ]
"#;
    let root = RamlParser::default().parse_str(doc).unwrap();
    let get = root.resource("/books", Some("get")).unwrap();
    assert_eq!(
        get.attributes.query_params[0].description.as_deref(),
        Some("Search books by title")
    );
    assert_eq!(
        get.attributes.description.as_deref(),
        Some("All books in the get listing")
    );
    assert_eq!(get.is[0].name(), "searchable");
    assert_eq!(get.is[0].params().map(|p| p["field"].as_str()), Some("title"));
}

#[test]
fn test_parameterized_templates_pass_validation() {
    let doc = r#"
title: Typed
traits:
  - typed:
      queryParameters:
        page:
          type: <<pageType>>
resourceTypes:
  - listing:
      get:
        headers:
          X-Total:
            type: <<countType>>
/pages:
  type: { listing: { countType: number } }
  get:
    is: [ { typed: { pageType: integer } } ]
"#;
    let root = RamlParser::default().parse_str(doc).unwrap();
    let get = root.resource("/pages", Some("get")).unwrap();
    assert_eq!(get.attributes.query_params[0].param_type, "integer");
    assert_eq!(get.attributes.headers[0].param_type, "number");
    assert!(root
        .diagnostics()
        .iter()
        .all(|d| d.kind != DiagnosticKind::Validation));
}

#[test]
fn test_unknown_tag_is_recorded_and_left_in_place() {
    let doc = r#"
title: Tags
resourceTypes:
  - item:
      get:
        description: <<resourcePathName | !shout>>
/things:
  type: item
"#;
    let root = RamlParser::new(lenient()).parse_str(doc).unwrap();
    let get = root.resource("/things", Some("get")).unwrap();
    assert_eq!(
        get.attributes.description.as_deref(),
        Some("<<resourcePathName | !shout>>")
    );
    assert!(root
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnknownTag));
}

#[test]
fn test_chained_types_reach_resources() {
    let doc = r#"
title: Chains
resourceTypes:
  - base:
      get:
        headers:
          X-Base:
        responses:
          200:
            description: Found
          404:
            description: Missing
  - readable:
      type: base
      get:
        description: Read <<resourcePathName>>
        headers:
          X-Child:
        responses:
          200:
            headers:
              ETag:
  - collection:
      type: readable
      post:
        description: Add to <<resourcePathName>>
/articles:
  type: collection
"#;
    let root = RamlParser::default().parse_str(doc).unwrap();
    let methods: Vec<_> = root.resources.iter().filter_map(|r| r.method.clone()).collect();
    assert_eq!(methods, vec!["get", "post"]);

    let get = root.resource("/articles", Some("get")).unwrap();
    assert_eq!(get.attributes.description.as_deref(), Some("Read articles"));
    let headers: Vec<_> = get.attributes.headers.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(headers, vec!["X-Child", "X-Base"]);
    let codes: Vec<_> = get.attributes.responses.iter().map(|r| r.code.clone()).collect();
    assert_eq!(codes, vec![ResponseCode::Code(200), ResponseCode::Code(404)]);
    let ok = &get.attributes.responses[0];
    assert_eq!(ok.description.as_deref(), Some("Found"));
    assert_eq!(ok.headers[0].name, "ETag");
    assert_eq!(
        get.resource_type.as_ref().map(|t| t.chain.clone()),
        Some(vec!["readable".to_string(), "base".to_string()])
    );
    assert_eq!(
        root.resource_types.flattened("collection").map(|f| f.chain.len()),
        Some(2)
    );
}

#[test]
fn test_resource_responses_fold_over_inherited_ones() {
    let doc = r#"
title: Responses
mediaType: application/json
traits:
  - failing:
      responses:
        500:
          description: Server error
resourceTypes:
  - item:
      get:
        responses:
          200:
            description: The item
            body:
              application/xml:
/widgets/{id}:
  type: item
  get:
    is: [failing]
    responses:
      200:
        body:
          application/json:
            example: '{"id": 1}'
"#;
    let root = RamlParser::default().parse_str(doc).unwrap();
    let get = root.resource("/widgets/{id}", Some("get")).unwrap();
    let codes: Vec<_> = get.attributes.responses.iter().map(|r| r.code.to_string()).collect();
    assert_eq!(codes, vec!["500", "200"]);
    let ok = &get.attributes.responses[1];
    assert_eq!(ok.description.as_deref(), Some("The item"));
    let mimes: Vec<_> = ok.body.iter().map(|b| b.mime_type.as_str()).collect();
    assert_eq!(mimes, vec!["application/xml", "application/json"]);
    assert!(matches!(ok.body[1].example, Some(LoadedSchema::Structured(_))));
    assert_eq!(get.attributes.uri_params[0].name, "id");
    assert!(get.attributes.uri_params[0].synthesized);
}

#[test]
fn test_cycles_fail_a_validated_parse() {
    let doc = r#"
title: Loop
resourceTypes:
  a:
    type: b
    get:
  b:
    type: a
/x:
  type: a
"#;
    match RamlParser::default().parse_str(doc) {
        Err(AppError::Invalid(invalid)) => {
            assert!(invalid
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::Cycle));
        }
        other => panic!("expected a cycle error, got {:?}", other.map(|r| r.resources.len())),
    }
    let root = RamlParser::new(lenient()).parse_str(doc).unwrap();
    assert_eq!(root.resources.len(), 1);
}

#[test]
fn test_map_form_sections() {
    let config = ParserConfig::from_yaml_str("raml_version: '1.0'\nvalidate: false\n").unwrap();
    let doc = r#"
title: Maps
traits:
  paged:
    queryParameters:
      page?: integer
resourceTypes:
  collection:
    get:
/items:
  type: collection
  is: [paged]
"#;
    let root = RamlParser::new(config).parse_str(doc).unwrap();
    let get = root.resource("/items", Some("get")).unwrap();
    let page = &get.attributes.query_params[0];
    assert_eq!(page.name, "page");
    assert_eq!(page.param_type, "integer");
    assert!(!page.required);
}

struct TaggingLoader;

impl SchemaLoader for TaggingLoader {
    fn load(&self, raw: &Value) -> LoadedSchema {
        LoadedSchema::Opaque(format!("loaded:{}", raw.as_str().unwrap_or_default()))
    }
}

struct NoDeletes;

impl Validator for NoDeletes {
    fn validate(&self, location: &str, attribute: &Attribute<'_>, diagnostics: &Diagnostics) {
        if let Attribute::Bodies(bodies) = attribute {
            if location.contains(".delete.") && !bodies.is_empty() {
                diagnostics.record(DiagnosticKind::Validation, location, "delete takes no body");
            }
        }
    }
}

#[test]
fn test_pluggable_loader_and_validator() {
    let doc = r#"
title: Plugins
/things:
  delete:
    body:
      text/plain:
        schema: anything
"#;
    let parser = RamlParser::new(lenient())
        .with_schema_loader(TaggingLoader)
        .with_validator(NoDeletes);
    let root = parser.parse_str(doc).unwrap();
    let delete = root.resource("/things", Some("delete")).unwrap();
    assert_eq!(
        delete.attributes.body[0].schema,
        Some(LoadedSchema::Opaque("loaded:anything".into()))
    );
    let validation: Vec<_> = root
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Validation)
        .map(|d| d.location.clone())
        .collect();
    assert_eq!(validation, vec!["/things.delete.body".to_string()]);
}

#[test]
fn test_merge_is_idempotent_on_documents() {
    let child: Mapping = serde_yaml::from_str("get: {description: child}\n").unwrap();
    let parent: Mapping =
        serde_yaml::from_str("get: {description: parent, headers: {A: ~}}\npost: {}\n").unwrap();
    let diagnostics = Diagnostics::new();
    let once = merge_mappings(&child, &parent, "", &diagnostics);
    let twice = merge_mappings(&once, &parent, "", &diagnostics);
    assert_eq!(once, twice);
    assert_eq!(diagnostics.len(), 1);
}
