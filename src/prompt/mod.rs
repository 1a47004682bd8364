use serde::{Deserialize, Serialize};

use crate::errors::GenError;

/// Identifier into the prompt catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromptKey {
    SeleniumJavaPageOnly,
    PlaywrightTypescriptPageOnly,
    CucumberOnly,
    CucumberWithSeleniumJavaSteps,
    CucumberWithPlaywrightTsSteps,
    TestdataJsonMultiple,
}

impl PromptKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKey::SeleniumJavaPageOnly => "SELENIUM_JAVA_PAGE_ONLY",
            PromptKey::PlaywrightTypescriptPageOnly => "PLAYWRIGHT_TYPESCRIPT_PAGE_ONLY",
            PromptKey::CucumberOnly => "CUCUMBER_ONLY",
            PromptKey::CucumberWithSeleniumJavaSteps => "CUCUMBER_WITH_SELENIUM_JAVA_STEPS",
            PromptKey::CucumberWithPlaywrightTsSteps => "CUCUMBER_WITH_PLAYWRIGHT_TS_STEPS",
            PromptKey::TestdataJsonMultiple => "TESTDATA_JSON_MULTIPLE",
        }
    }

    /// Human-readable generator-type names for CLI listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            PromptKey::SeleniumJavaPageOnly => "Selenium-Java-Page-Only",
            PromptKey::PlaywrightTypescriptPageOnly => "Playwright-Typescript-Page-Only",
            PromptKey::CucumberOnly => "Cucumber-Only",
            PromptKey::CucumberWithSeleniumJavaSteps => "Cucumber-With-Selenium-Java-Steps",
            PromptKey::CucumberWithPlaywrightTsSteps => "Cucumber-With-Playwright-TS-Steps",
            PromptKey::TestdataJsonMultiple => "TestData-Json-Multiple",
        }
    }
}

/// Variables available for substitution. `record_count` only applies to the
/// test-data template.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub dom_content: String,
    pub page_url: String,
    pub user_action: String,
    pub record_count: Option<u32>,
}

impl PromptVars {
    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("domContent", self.dom_content.clone()),
            ("pageUrl", self.page_url.clone()),
            ("userAction", self.user_action.clone()),
        ];
        if let Some(n) = self.record_count {
            out.push(("recordCount", n.to_string()));
        }
        out
    }
}

/// Fill template variables in a prompt.
///
/// Substitution replaces every `${name}` occurrence, and every `{{name}}`
/// occurrence for the record-count template family, with the stringified
/// variable. Variables the template never references are ignored; referenced
/// variables absent from the input stay literally in place. Only an unknown
/// key is an error.
pub fn render(key: PromptKey, vars: &PromptVars) -> Result<String, GenError> {
    let template = CATALOG
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, t)| *t)
        .ok_or_else(|| GenError::TemplateNotFound(key.as_str().to_string()))?;

    let mut prompt = template.to_string();
    for (name, value) in vars.entries() {
        prompt = prompt.replace(&format!("${{{name}}}"), &value);
        prompt = prompt.replace(&format!("{{{{{name}}}}}"), &value);
    }
    Ok(prompt.trim().to_string())
}

/// Collection of default prompts for different use cases (ICE POT format).
static CATALOG: &[(PromptKey, &str)] = &[
    (PromptKey::SeleniumJavaPageOnly, SELENIUM_JAVA_PAGE_ONLY),
    (PromptKey::PlaywrightTypescriptPageOnly, PLAYWRIGHT_TYPESCRIPT_PAGE_ONLY),
    (PromptKey::CucumberOnly, CUCUMBER_ONLY),
    (PromptKey::CucumberWithSeleniumJavaSteps, CUCUMBER_WITH_SELENIUM_JAVA_STEPS),
    (PromptKey::CucumberWithPlaywrightTsSteps, CUCUMBER_WITH_PLAYWRIGHT_TS_STEPS),
    (PromptKey::TestdataJsonMultiple, TESTDATA_JSON_MULTIPLE),
];

const SELENIUM_JAVA_PAGE_ONLY: &str = r#"
Instructions:
- Generate ONLY a Selenium Java Page Object Class (no test code).
- Add JavaDoc for methods & class.
- Use Selenium 2.30+ compatible imports.
- Use meaningful method names.
- Do NOT include explanations or test code.

Context:
DOM:
```html
${domContent}
```

Example:
```java
package com.testgen.pages;

/**
 * Page Object for Component Page
 */
public class ComponentPage {
    // Add methods as per the DOM
}
```

Persona:
- Audience: Automation engineer focusing on maintainable POM structure.

Output Format:
- A single Java class inside a ```java``` block.

Tone:
- Clean, maintainable, enterprise-ready.
"#;

const CUCUMBER_ONLY: &str = r#"
Instructions:
- Generate ONLY a Cucumber (.feature) file.
- Use Scenario Outline with Examples table.
- Make sure every step is relevant to the provided DOM.
- Do not combine multiple actions into one step.
- Use South India realistic dataset (names, addresses, pin codes, mobile numbers).
- Use dropdown values only from provided DOM.
- Generate multiple scenarios if applicable.

Context:
DOM:
```html
${domContent}
```

Example:
```gherkin
Feature: Login to OpenTaps

Scenario Outline: Successful login with valid credentials
  Given I open the login page
  When I type "<username>" into the Username field
  And I type "<password>" into the Password field
  And I click the Login button
  Then I should be logged in successfully

Examples:
  | username   | password  |
  | "testuser" | "testpass"|
  | "admin"    | "admin123"|
```

Persona:
- Audience: BDD testers who only need feature files.

Output Format:
- Only valid Gherkin in a ```gherkin``` block.

Tone:
- Clear, structured, executable.
"#;

const CUCUMBER_WITH_SELENIUM_JAVA_STEPS: &str = r#"
Instructions:
- Generate BOTH:
  1. A Cucumber .feature file.
  2. A Java step definition class for selenium.
- Do NOT include Page Object code.
- Step defs must include WebDriver setup, explicit waits, and actual Selenium code.
- Use Scenario Outline with Examples table (South India realistic data).

Context:
DOM:
```html
${domContent}
```
URL: ${pageUrl}

Example:
```gherkin
Feature: Login to OpenTaps

Scenario Outline: Successful login with valid credentials
  Given I open the login page
  When I type "<username>" into the Username field
  And I type "<password>" into the Password field
  And I click the Login button
  Then I should be logged in successfully

Examples:
  | username   | password  |
  | "admin"    | "admin123"|
```

```java
package com.testgen.stepdefs;

import io.cucumber.java.en.*;
import org.openqa.selenium.*;
import org.openqa.selenium.chrome.ChromeDriver;
import org.openqa.selenium.support.ui.*;

public class LoginStepDefinitions {
    private WebDriver driver;
    private WebDriverWait wait;

    @io.cucumber.java.Before
    public void setUp() {
        driver = new ChromeDriver();
        wait = new WebDriverWait(driver, Duration.ofSeconds(10));
        driver.manage().window().maximize();
    }

    @io.cucumber.java.After
    public void tearDown() {
        if (driver != null) driver.quit();
    }

    @Given("I open the login page")
    public void openLoginPage() {
        driver.get("${pageUrl}");
    }

    @When("I type {string} into the Username field")
    public void enterUsername(String username) {
        WebElement el = wait.until(ExpectedConditions.elementToBeClickable(By.id("username")));
        el.sendKeys(username);
    }

    @When("I type {string} into the Password field")
    public void enterPassword(String password) {
        WebElement el = wait.until(ExpectedConditions.elementToBeClickable(By.id("password")));
        el.sendKeys(password);
    }

    @When("I click the Login button")
    public void clickLogin() {
        driver.findElement(By.xpath("//button[contains(text(),'Login')]")).click();
    }

    @Then("I should be logged in successfully")
    public void verifyLogin() {
        WebElement success = wait.until(ExpectedConditions.visibilityOfElementLocated(By.className("success")));
        assert success.isDisplayed();
    }
}
```

Persona:
- Audience: QA engineers working with Cucumber & Selenium.

Output Format:
- Gherkin in ```gherkin``` block + Java code in ```java``` block.

Tone:
- Professional, executable, structured.
"#;

const TESTDATA_JSON_MULTIPLE: &str = r#"
Instructions:
- Generate ONLY test data in JSON format (no code, no explanations).
- [CRITICAL] Produce three grouped arrays at the top level: "positive", "negative", and "edgeCases".
- [CRITICAL] Each array ("positive", "negative", "edgeCases") MUST contain **exactly {{recordCount}} objects**. Do not generate more or fewer than {{recordCount}} objects per array.
- For each generated object:
  - Include all fields discovered from the DOM (use the keys derived above).
  - Include a "category" key with value exactly one of: "Positive", "Negative", "Edge Cases".
- Use Faker library for generating realistic and varied data for each field.
- Each dataset must contain field values according to its category behavior.
- Ensure variety and coverage of validations for each category.
- Maintain strict JSON structure with objects grouped under their respective category.
- [IMPORTANT] If you generate more or fewer than {{recordCount}} objects in any array, your answer will be rejected.
- Output ONLY a single JSON object, inside a ```json``` block, with this structure:
  ```json
  {
    "positive": [ /* {{recordCount}} objects */ ],
    "negative": [ /* {{recordCount}} objects */ ],
    "edgeCases": [ /* {{recordCount}} objects */ ]
  }
  ```

Context:
DOM:
```html
${domContent}
```

Example (Readable format):
```
{
  "positive": [
    { "username": "user01", "password": "Pass@1234", "phone": "+1-202-555-0189" },
    { "username": "testUser", "password": "Valid@456", "phone": "+91-9876543210" }
  ],
  "negative": [
    { "username": "user@@@", "password": "123", "phone": "abc" },
    { "username": "", "password": "short", "phone": "999" }
  ],
  "edgeCases": [
    { "username": " ", "password": "P@ssword!", "phone": null },
    { "username": "averylongusername_exceeding_limit", "password": "Edge@999", "phone": "+44-0000000000" }
  ]
}
```

Persona:
- Audience: QA/Automation engineers needing grouped, structured test data for data-driven testing across Positive, Negative, and Edge Cases.

Output Format:
- A single JSON block inside a ```json``` block with each category strictly based on the total of {{recordCount}} objects.

Tone:
- Structured, maintainable, enterprise-ready.
"#;

const PLAYWRIGHT_TYPESCRIPT_PAGE_ONLY: &str = r#"
Instructions:
- Generate ONLY a Playwright TypeScript Page Object Class (no test/spec code).
- Use ICE POT framework style (Intent, Context, Example, Persona, Output, Tone).
- Provide proper TypeScript typings, exported class, constructor accepting Playwright Page.
- Use Playwright best practices (locators, explicit waits where appropriate), add JSDoc/TSDoc comments.
- Do NOT include explanations or test runner configuration.

Context:
DOM:
```html
${domContent}
```

Example:
```typescript
import { Page, Locator } from '@playwright/test';

/**
 * Page Object for Component Page (ICE POT)
 */
export class ComponentPage {
  private page: Page;
  private submitBtn: Locator;

  constructor(page: Page) {
    this.page = page;
    this.submitBtn = page.locator('button[type="submit"]');
  }

  /** Click the submit button */
  async clickSubmit() {
    await this.submitBtn.click();
  }
}
```

Persona:
- Audience: Automation engineers using Playwright + TypeScript (ICE POT format).

Output Format:
- A single TypeScript file inside a ```typescript``` block.

Tone:
- Clean, maintainable, enterprise-ready.
"#;

const CUCUMBER_WITH_PLAYWRIGHT_TS_STEPS: &str = r#"
Instructions:
- Generate BOTH:
  1. A Cucumber .feature file.
  2. TypeScript step definition files using Playwright (no page objects unless explicitly requested).
- Use ICE POT framework style.
- Step defs must include Playwright Page usage, proper async/await, and explicit waits where needed.
- Provide proper imports for @cucumber/cucumber and Playwright.
- Use Scenario Outline with Examples table (South India realistic data).

Context:
DOM:
```html
${domContent}
```
URL: ${pageUrl}

Example:
```gherkin
Feature: Login to Application

Scenario Outline: Successful login with valid credentials
  Given I open the login page
  When I type "<username>" into the Username field
  And I type "<password>" into the Password field
  And I click the Login button
  Then I should be logged in successfully

Examples:
  | username   | password  |
  | "testuser" | "testpass"|
  | "admin"    | "admin123"|
```

```typescript
// Example step definition using Playwright + Cucumber (ICE POT)
import { Given, When, Then, Before, After } from '@cucumber/cucumber';
import { chromium, Browser, Page } from 'playwright';

let browser: Browser;
let page: Page;

Before(async function() {
  browser = await chromium.launch({ headless: true });
  page = await browser.newPage();
});

After(async function() {
  await browser.close();
});

Given('I open the login page', async function() {
  await page.goto('${pageUrl}');
});

When('I type {string} into the Username field', async function(username: string) {
  await page.fill('#username', username);
});

When('I type {string} into the Password field', async function(password: string) {
  await page.fill('#password', password);
});

When('I click the Login button', async function() {
  await page.click('button:has-text("Login")');
});

Then('I should be logged in successfully', async function() {
  await page.waitForSelector('.success', { state: 'visible', timeout: 5000 });
});
```

Persona:
- Audience: QA engineers using Playwright + TypeScript with Cucumber.

Output Format:
- Gherkin in ```gherkin``` block + TypeScript code in ```typescript``` block.

Tone:
- Professional, executable, structured.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dom_and_url_placeholders() {
        let vars = PromptVars {
            dom_content: "<form id=\"login\"/>".into(),
            page_url: "https://example.test/login".into(),
            ..Default::default()
        };
        let out = render(PromptKey::CucumberWithSeleniumJavaSteps, &vars).unwrap();
        assert!(out.contains("<form id=\"login\"/>"));
        assert!(out.contains("URL: https://example.test/login"));
        assert!(out.contains("driver.get(\"https://example.test/login\")"));
        assert!(!out.contains("${domContent}"));
        assert!(!out.contains("${pageUrl}"));
    }

    #[test]
    fn record_count_fills_double_brace_placeholders() {
        let vars = PromptVars {
            dom_content: "<x/>".into(),
            record_count: Some(5),
            ..Default::default()
        };
        let out = render(PromptKey::TestdataJsonMultiple, &vars).unwrap();
        assert!(out.contains("exactly 5 objects"));
        assert!(out.contains("\"positive\": [ /* 5 objects */ ]"));
        assert!(out.contains("<x/>"));
        assert!(!out.contains("{{recordCount}}"));
    }

    #[test]
    fn missing_variable_leaves_placeholder_untouched() {
        let vars = PromptVars { dom_content: "<x/>".into(), ..Default::default() };
        let out = render(PromptKey::TestdataJsonMultiple, &vars).unwrap();
        // recordCount was not supplied, so the placeholder must survive verbatim.
        assert!(out.contains("{{recordCount}}"));
    }

    #[test]
    fn unreferenced_variables_are_ignored() {
        let vars = PromptVars {
            dom_content: "<x/>".into(),
            page_url: "https://nowhere.test".into(),
            ..Default::default()
        };
        // SELENIUM_JAVA_PAGE_ONLY never references pageUrl.
        let out = render(PromptKey::SeleniumJavaPageOnly, &vars).unwrap();
        assert!(!out.contains("https://nowhere.test"));
    }

    #[test]
    fn rendered_output_is_trimmed() {
        let out = render(PromptKey::CucumberOnly, &PromptVars::default()).unwrap();
        assert_eq!(out, out.trim());
    }
}
