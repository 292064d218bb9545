#![allow(dead_code)]

use docmapper::{memory::MemoryDriver, prelude::*};

pub fn registry() -> Registry {
    Registry::builder()
        .define(
            ModelBuilder::new("Heffalump")
                .property(Property::new("color", PropertyType::STRING))
                .property(Property::new("num_spots", PropertyType::INTEGER))
                .property(Property::new("born", PropertyType::DATETIME)),
        )
        .define(
            ModelBuilder::new("Zoo")
                .property(Property::new("name", PropertyType::STRING))
                .property(Property::new("animals", PropertyType::EmbeddedArray))
                .property(Property::new("address", PropertyType::EmbeddedMap))
                .embeds_many("keepers", "Keeper")
                .embeds_one("director", "Keeper"),
        )
        .define(
            ModelBuilder::embedded("Keeper")
                .property(Property::new("name", PropertyType::STRING))
                .property(Property::new("years", PropertyType::INTEGER)),
        )
        .define(
            ModelBuilder::new("Group")
                .property(Property::new("name", PropertyType::STRING))
                .has_many("users", "User", "group_id"),
        )
        .define(
            ModelBuilder::new("User")
                .property(Property::new("name", PropertyType::STRING))
                .property(Property::new("group_id", PropertyType::Reference))
                .belongs_to("group", "Group", "group_id"),
        )
        .build()
        .unwrap()
}

pub fn adapter() -> Adapter<MemoryDriver> {
    Adapter::new(registry(), MemoryDriver::new())
}

pub fn keeper(registry: &Registry, name: &str, years: i64) -> EmbeddedResource {
    EmbeddedResource::new(registry, "Keeper")
        .unwrap()
        .with("name", name)
        .unwrap()
        .with("years", years)
        .unwrap()
}

pub async fn create(adapter: &Adapter<MemoryDriver>, model: &str, values: &[(&str, Value)]) -> Resource {
    let mut resource = Resource::new(adapter.registry(), model).unwrap();
    for (name, value) in values {
        resource.set(name, value.clone()).unwrap();
    }

    adapter.create(&mut resource).await.unwrap();
    resource
}

pub fn names(resources: &[Resource]) -> Vec<String> {
    resources
        .iter()
        .map(|r| r.get("name").unwrap().as_str().unwrap_or_default().to_string())
        .collect()
}
