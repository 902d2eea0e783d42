//! XML payload builders for the mock catalog.

/// Search response listing `(id, primary name)` board games.
pub fn search_xml(items: &[(u64, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<item type="boardgame" id="{}"><name type="primary" value="{}"/></item>"#,
                id,
                xml_escape(name)
            )
        })
        .collect();
    format!(r#"<items total="{}">{}</items>"#, items.len(), body)
}

/// Item metadata payload with statistics and a couple of links.
pub fn item_xml(id: u64, name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
    <item type="boardgame" id="{id}">
        <thumbnail>https://cf.geekdo-images.com/{id}__thumb/img/t.jpg</thumbnail>
        <image>https://cf.geekdo-images.com/{id}__original/img/i.jpg?cache=1</image>
        <name type="primary" sortindex="1" value="{name}"/>
        <link type="boardgamecategory" id="1021" value="Economic"/>
        <link type="boardgamemechanic" id="2072" value="Dice Rolling"/>
        <statistics page="1">
            <ratings>
                <usersrated value="1000"/>
                <average value="7.5"/>
                <bayesaverage value="7.1"/>
                <averageweight value="2.3"/>
            </ratings>
        </statistics>
    </item>
</items>"#,
        id = id,
        name = xml_escape(name)
    )
}

/// Version payload carrying only an image.
pub fn version_xml(version_id: u64, image: &str) -> String {
    format!(
        r#"<items><item type="boardgameversion" id="{}"><image>{}</image></item></items>"#,
        version_id,
        xml_escape(image)
    )
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
